// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Metronome click generator.
//!
//! Each beat starts a 10 ms burst: a 2 kHz sine under a squared linear decay.

use std::f64::consts::PI;

use crate::audio::AudioBuffer;

/// Click length in seconds
pub const CLICK_DURATION: f64 = 0.01;

/// Click tone frequency in Hz
pub const CLICK_FREQUENCY: f64 = 2000.0;

/// Default click gain
pub const DEFAULT_CLICK_GAIN: f32 = 0.5;

/// Metronome state
#[derive(Debug, Clone)]
pub struct Metronome {
    /// Whether clicks are mixed in
    enabled: bool,
    /// Seconds per beat
    beat_interval: f64,
    /// Seconds since the current click started
    click_phase: f64,
    /// Session time of the last beat
    last_beat_time: f64,
    /// Linear click gain
    click_gain: f32,
}

impl Metronome {
    /// Create a disabled metronome at `bpm`
    pub fn new(bpm: f64, click_gain: f32) -> Self {
        let beat_interval = interval_for(bpm).unwrap_or(0.5);
        Self {
            enabled: false,
            beat_interval,
            click_phase: CLICK_DURATION,
            last_beat_time: -beat_interval,
            click_gain,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Flip the enabled flag, returning the new state
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Seconds per beat
    pub fn beat_interval(&self) -> f64 {
        self.beat_interval
    }

    /// Follow a new master tempo
    pub fn set_bpm(&mut self, bpm: f64) {
        if let Some(interval) = interval_for(bpm) {
            self.beat_interval = interval;
        }
    }

    pub fn click_gain(&self) -> f32 {
        self.click_gain
    }

    pub fn set_click_gain(&mut self, gain: f32) {
        if gain.is_finite() {
            self.click_gain = gain.max(0.0);
        }
    }

    /// Rewind so the next block starting at time 0 clicks immediately
    pub fn reset(&mut self) {
        self.last_beat_time = -self.beat_interval;
        self.click_phase = CLICK_DURATION;
    }

    /// Mix clicks for `frame_count` frames starting at session time
    /// `play_position` into every channel of `output`.
    pub fn render(
        &mut self,
        output: &mut AudioBuffer,
        frame_count: usize,
        play_position: f64,
        sample_rate: u32,
    ) {
        if !self.enabled || sample_rate == 0 {
            return;
        }
        let step = 1.0 / sample_rate as f64;
        let frames = frame_count.min(output.num_frames());

        for i in 0..frames {
            let t = play_position + i as f64 * step;
            if t - self.last_beat_time >= self.beat_interval {
                self.last_beat_time = t;
                self.click_phase = 0.0;
            }

            let sample = self.click_sample();
            if sample != 0.0 {
                for ch in 0..output.num_channels() {
                    output.channel_mut(ch)[i] += sample;
                }
            }
            self.click_phase += step;
        }
    }

    fn click_sample(&self) -> f32 {
        if self.click_phase >= CLICK_DURATION {
            return 0.0;
        }
        let envelope = 1.0 - self.click_phase / CLICK_DURATION;
        let tone = (2.0 * PI * CLICK_FREQUENCY * self.click_phase).sin();
        (envelope * envelope * tone) as f32 * self.click_gain
    }
}

fn interval_for(bpm: f64) -> Option<f64> {
    (bpm.is_finite() && bpm > 0.0).then(|| 60.0 / bpm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled(bpm: f64) -> Metronome {
        let mut metronome = Metronome::new(bpm, DEFAULT_CLICK_GAIN);
        metronome.set_enabled(true);
        metronome
    }

    #[test]
    fn test_disabled_metronome_is_silent() {
        let mut metronome = Metronome::new(120.0, DEFAULT_CLICK_GAIN);
        let mut out = AudioBuffer::new(2, 512);
        metronome.render(&mut out, 512, 0.0, 44100);
        assert_eq!(out.peak(), 0.0);
    }

    #[test]
    fn test_first_click_at_time_zero() {
        let mut metronome = enabled(120.0);
        let mut out = AudioBuffer::new(2, 441);
        metronome.render(&mut out, 441, 0.0, 44100);
        assert!(out.peak() > 0.1);
        assert!(out.peak() <= DEFAULT_CLICK_GAIN);
        assert_eq!(out.channel(0), out.channel(1));
        // The click lasts 10 ms (441 samples at 44.1 kHz) and starts at 0
        assert_eq!(out.channel(0)[0], 0.0);
    }

    #[test]
    fn test_clicks_repeat_each_beat() {
        let mut metronome = enabled(120.0);
        let rate = 8000;
        let mut out = AudioBuffer::new(1, 16000);
        metronome.render(&mut out, 16000, 0.0, rate);
        let data = out.channel(0);
        for beat in 0..4 {
            let start = beat * 4000;
            let click = data[start..start + 100].iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(click > 0.1, "beat {} missing", beat);
            assert!(data[start + 100..start + 4000].iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_reset_rearms_first_click() {
        let mut metronome = enabled(60.0);
        let mut out = AudioBuffer::new(1, 4410);
        metronome.render(&mut out, 4410, 0.0, 44100);
        metronome.reset();
        let mut out = AudioBuffer::new(1, 64);
        metronome.render(&mut out, 64, 0.0, 44100);
        assert!(out.peak() > 0.1);
    }

    #[test]
    fn test_set_bpm_rejects_nonsense() {
        let mut metronome = Metronome::new(120.0, DEFAULT_CLICK_GAIN);
        metronome.set_bpm(0.0);
        assert_eq!(metronome.beat_interval(), 0.5);
        metronome.set_bpm(60.0);
        assert_eq!(metronome.beat_interval(), 1.0);
        assert!(metronome.toggle());
    }
}
