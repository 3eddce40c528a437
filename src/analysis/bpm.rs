// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Tempo estimation.
//!
//! Stages run in order until one produces a tempo inside [`MIN_BPM`, `MAX_BPM`]:
//! 1. Onset clustering over a coarse spectral-flux series
//! 2. Autocorrelation of a frame-energy onset series
//! 3. Assume the clip holds 4, 8, 16 or 32 beats
//! 4. A fixed default
//!
//! None of this uses an FFT; the "spectrum" of a frame is its absolute
//! amplitude sampled once per bin index. It is cheap and good enough for
//! percussive loops.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::audio::AudioBuffer;

/// Lowest tempo the estimator reports
pub const MIN_BPM: f64 = 60.0;

/// Highest tempo the estimator reports
pub const MAX_BPM: f64 = 200.0;

/// Which stage produced a tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BpmSource {
    /// Onset interval clustering
    Onset,
    /// Autocorrelation of onset energy
    Autocorrelation,
    /// Beat count guessed from clip duration
    Duration,
    /// Nothing worked
    Default,
    /// Entered by the user
    Manual,
}

impl BpmSource {
    /// True for the guesses a user should double-check
    pub fn is_low_confidence(&self) -> bool {
        matches!(self, BpmSource::Duration | BpmSource::Default)
    }
}

impl fmt::Display for BpmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BpmSource::Onset => "onset",
            BpmSource::Autocorrelation => "autocorrelation",
            BpmSource::Duration => "duration",
            BpmSource::Default => "default",
            BpmSource::Manual => "manual",
        };
        f.write_str(name)
    }
}

/// Result of an estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BpmEstimate {
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Stage that produced it
    pub source: BpmSource,
}

/// Estimator parameters
#[derive(Debug, Clone)]
pub struct BpmEstimator {
    /// Analysis frame length in samples
    pub frame_size: usize,
    /// Hop between frames in samples
    pub hop_size: usize,
    /// Peak threshold relative to the largest onset value
    pub peak_threshold: f32,
    /// Intervals closer than this (seconds) share a cluster
    pub cluster_tolerance: f64,
    /// Minimum detected onsets for the first stage
    pub min_onsets: usize,
    /// Tempo returned when every stage fails
    pub fallback_bpm: f64,
}

impl Default for BpmEstimator {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            peak_threshold: 0.3,
            cluster_tolerance: 0.05,
            min_onsets: 4,
            fallback_bpm: 120.0,
        }
    }
}

/// Estimate with default parameters
pub fn estimate_bpm(buffer: &AudioBuffer, sample_rate: u32) -> BpmEstimate {
    BpmEstimator::default().estimate(buffer, sample_rate)
}

impl BpmEstimator {
    /// Create an estimator with default parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the pipeline. Always returns a tempo in range.
    pub fn estimate(&self, buffer: &AudioBuffer, sample_rate: u32) -> BpmEstimate {
        if sample_rate > 0 && self.hop_size > 0 && self.frame_size >= self.hop_size {
            if let Some(bpm) = self.onset_tempo(buffer, sample_rate).filter(|b| in_range(*b)) {
                return BpmEstimate {
                    bpm,
                    source: BpmSource::Onset,
                };
            }
            if let Some(bpm) = self
                .autocorrelation_tempo(buffer, sample_rate)
                .filter(|b| in_range(*b))
            {
                return BpmEstimate {
                    bpm,
                    source: BpmSource::Autocorrelation,
                };
            }
            let duration = buffer.num_frames() as f64 / sample_rate as f64;
            if let Some(bpm) = duration_tempo(duration) {
                return BpmEstimate {
                    bpm,
                    source: BpmSource::Duration,
                };
            }
        }

        BpmEstimate {
            bpm: self.fallback_bpm,
            source: BpmSource::Default,
        }
    }

    /// Stage 1: cluster inter-onset intervals
    pub fn onset_tempo(&self, buffer: &AudioBuffer, sample_rate: u32) -> Option<f64> {
        let flux = self.spectral_flux(buffer);
        let onsets = self.pick_onsets(&flux, sample_rate);
        if onsets.len() < self.min_onsets {
            return None;
        }

        let intervals = onsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|&i| i > 0.1 && i < 2.0);

        // (sum, count) per cluster, matched against the running mean
        let mut clusters: Vec<(f64, usize)> = Vec::new();
        for interval in intervals {
            match clusters
                .iter_mut()
                .find(|(sum, count)| (sum / *count as f64 - interval).abs() <= self.cluster_tolerance)
            {
                Some(cluster) => {
                    cluster.0 += interval;
                    cluster.1 += 1;
                }
                None => clusters.push((interval, 1)),
            }
        }

        let mut best: Option<(f64, usize)> = None;
        for &(sum, count) in &clusters {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((sum, count));
            }
        }
        let (sum, count) = best?;
        let interval = sum / count as f64;
        octave_correct(60.0 / interval)
    }

    /// Stage 2: autocorrelate frame-energy increases
    pub fn autocorrelation_tempo(&self, buffer: &AudioBuffer, sample_rate: u32) -> Option<f64> {
        let onsets = self.energy_onsets(&buffer.to_mono());
        let frames_per_second = sample_rate as f64 / self.hop_size as f64;

        let min_lag = ((frames_per_second * 60.0 / MAX_BPM).floor() as usize).max(1);
        let max_lag = (frames_per_second * 60.0 / MIN_BPM).ceil() as usize;
        let max_lag = max_lag.min(onsets.len().saturating_sub(1));
        if max_lag < min_lag {
            return None;
        }

        let mut best_lag = 0;
        let mut best_corr = 0.0f64;
        for lag in min_lag..=max_lag {
            let corr: f64 = onsets
                .iter()
                .zip(&onsets[lag..])
                .map(|(a, b)| (a * b) as f64)
                .sum();
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }
        }

        if best_lag == 0 {
            return None;
        }
        octave_correct(60.0 * frames_per_second / best_lag as f64)
    }

    /// Positive change of the coarse per-bin amplitude summary, per hop
    fn spectral_flux(&self, buffer: &AudioBuffer) -> Vec<f32> {
        let frames = buffer.num_frames();
        let channels = buffer.num_channels();
        if channels == 0 || frames < self.frame_size {
            return Vec::new();
        }

        let bins = self.frame_size / 2;
        let scale = 1.0 / channels as f32;
        let mut previous = vec![0.0f32; bins];
        let mut current = vec![0.0f32; bins];
        let mut flux = Vec::with_capacity((frames - self.frame_size) / self.hop_size + 1);

        let mut start = 0;
        while start + self.frame_size <= frames {
            for (bin, value) in current.iter_mut().enumerate() {
                *value = buffer.channels().map(|c| c[start + bin].abs()).sum::<f32>() * scale;
            }
            let sum: f32 = current
                .iter()
                .zip(&previous)
                .map(|(c, p)| (c - p).max(0.0))
                .sum();
            flux.push(sum);
            std::mem::swap(&mut current, &mut previous);
            start += self.hop_size;
        }
        flux
    }

    /// Times (seconds) of interior local maxima above the threshold
    fn pick_onsets(&self, flux: &[f32], sample_rate: u32) -> Vec<f64> {
        if flux.len() < 3 {
            return Vec::new();
        }
        let max = flux.iter().fold(0.0f32, |m, &v| m.max(v));
        if max <= 0.0 {
            return Vec::new();
        }
        let threshold = max * self.peak_threshold;

        (1..flux.len() - 1)
            .filter(|&i| flux[i] > threshold && flux[i] > flux[i - 1] && flux[i] > flux[i + 1])
            .map(|i| (i * self.hop_size) as f64 / sample_rate as f64)
            .collect()
    }

    /// `max(0, energy[i] - energy[i-1])` per hop over a mono signal
    fn energy_onsets(&self, mono: &[f32]) -> Vec<f32> {
        if mono.len() < self.frame_size {
            return Vec::new();
        }
        let mut onsets = Vec::with_capacity((mono.len() - self.frame_size) / self.hop_size + 1);
        let mut previous = 0.0f32;
        let mut start = 0;
        while start + self.frame_size <= mono.len() {
            let energy: f32 = mono[start..start + self.frame_size].iter().map(|s| s * s).sum();
            onsets.push((energy - previous).max(0.0));
            previous = energy;
            start += self.hop_size;
        }
        onsets
    }
}

/// Stage 3: tempo implied by a whole number of beats in the clip
pub fn duration_tempo(duration_seconds: f64) -> Option<f64> {
    if !(duration_seconds > 0.0) || !duration_seconds.is_finite() {
        return None;
    }
    let candidates = [4.0, 8.0, 16.0, 32.0].map(|beats| beats * 60.0 / duration_seconds);
    candidates
        .iter()
        .copied()
        .find(|bpm| (65.0..=150.0).contains(bpm))
        .or_else(|| candidates.iter().copied().find(|bpm| in_range(*bpm)))
}

/// Fold a tempo into [70, 180] by octaves
fn octave_correct(mut bpm: f64) -> Option<f64> {
    if !bpm.is_finite() || bpm <= 0.0 {
        return None;
    }
    while bpm < 70.0 {
        bpm *= 2.0;
    }
    while bpm > 180.0 {
        bpm /= 2.0;
    }
    Some(bpm)
}

fn in_range(bpm: f64) -> bool {
    (MIN_BPM..=MAX_BPM).contains(&bpm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Decaying 64-sample bursts every `interval` seconds
    fn click_track(bpm: f64, seconds: f64, sample_rate: u32) -> AudioBuffer {
        let frames = (seconds * sample_rate as f64) as usize;
        let interval = (60.0 / bpm * sample_rate as f64) as usize;
        let mut data = vec![0.0f32; frames];
        let mut pos = 0;
        while pos < frames {
            for i in 0..64.min(frames - pos) {
                data[pos + i] = 1.0 - i as f32 / 64.0;
            }
            pos += interval;
        }
        AudioBuffer::from_channels(vec![data])
    }

    #[test]
    fn test_click_track_120() {
        let estimate = estimate_bpm(&click_track(120.0, 10.0, 44100), 44100);
        assert_eq!(estimate.source, BpmSource::Onset);
        assert!((estimate.bpm - 120.0).abs() < 2.0, "got {}", estimate.bpm);
    }

    #[test]
    fn test_impulse_click_track_120() {
        let sample_rate = 44100;
        let mut data = vec![0.0f32; 10 * sample_rate as usize];
        for pos in (0..data.len()).step_by(sample_rate as usize / 2) {
            data[pos] = 1.0;
        }
        let estimate = estimate_bpm(&AudioBuffer::from_channels(vec![data]), sample_rate);
        assert!((estimate.bpm - 120.0).abs() <= 2.0, "got {}", estimate.bpm);
    }

    #[test]
    fn test_click_track_stereo_100() {
        let mono = click_track(100.0, 12.0, 48000);
        let left = mono.channel(0).to_vec();
        let right: Vec<f32> = left.iter().map(|s| s * 0.5).collect();
        let buffer = AudioBuffer::from_channels(vec![left, right]);
        let estimate = estimate_bpm(&buffer, 48000);
        assert!((estimate.bpm - 100.0).abs() < 2.0, "got {}", estimate.bpm);
    }

    #[test]
    fn test_slow_clicks_are_octave_corrected() {
        let estimate = estimate_bpm(&click_track(40.0, 12.0, 44100), 44100);
        assert!((estimate.bpm - 80.0).abs() < 2.0, "got {}", estimate.bpm);
    }

    #[test]
    fn test_autocorrelation_stage_on_clicks() {
        let buffer = click_track(120.0, 10.0, 44100);
        let bpm = BpmEstimator::new().autocorrelation_tempo(&buffer, 44100).unwrap();
        assert!((bpm - 120.0).abs() < 2.0, "got {}", bpm);
    }

    #[test]
    fn test_silence_falls_back_to_duration() {
        let estimate = estimate_bpm(&AudioBuffer::new(2, 88200), 44100);
        assert_eq!(estimate.source, BpmSource::Duration);
        assert_eq!(estimate.bpm, 120.0);
        assert!(estimate.source.is_low_confidence());
    }

    #[test]
    fn test_empty_buffer_uses_default() {
        let estimate = estimate_bpm(&AudioBuffer::new(1, 0), 44100);
        assert_eq!(estimate.source, BpmSource::Default);
        assert_eq!(estimate.bpm, 120.0);
    }

    #[test]
    fn test_zero_sample_rate_uses_default() {
        let estimate = estimate_bpm(&AudioBuffer::new(1, 1000), 0);
        assert_eq!(estimate.source, BpmSource::Default);
    }

    #[test]
    fn test_noise_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<f32> = (0..44100 * 3).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let estimate = estimate_bpm(&AudioBuffer::from_channels(vec![data]), 44100);
        assert!(estimate.bpm >= MIN_BPM && estimate.bpm <= MAX_BPM);
    }

    #[test]
    fn test_duration_tempo() {
        assert_eq!(duration_tempo(2.0), Some(120.0));
        assert_eq!(duration_tempo(3.0), Some(80.0));
        // 4 beats in 1.5 s is 160: outside the preferred band, inside the range
        assert_eq!(duration_tempo(1.5), Some(160.0));
        assert_eq!(duration_tempo(1.0), None);
        assert_eq!(duration_tempo(0.0), None);
        assert_eq!(duration_tempo(f64::NAN), None);
    }

    #[test]
    fn test_octave_correct() {
        assert_eq!(octave_correct(50.0), Some(100.0));
        assert_eq!(octave_correct(240.0), Some(120.0));
        assert_eq!(octave_correct(120.0), Some(120.0));
        assert_eq!(octave_correct(0.0), None);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(BpmSource::Autocorrelation.to_string(), "autocorrelation");
        assert!(!BpmSource::Manual.is_low_confidence());
    }
}
