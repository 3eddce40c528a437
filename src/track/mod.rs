// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Looper tracks.
//!
//! A track owns one clip, its playback cursor, loop region and mix controls,
//! plus the time-stretch state used when the clip plays at a ratio other than
//! 1.0. [`Track::render_block`] is called from the audio thread and does not
//! lock or log. Stretcher queues are reserved up front for the largest block
//! at the smallest ratio.

pub mod clip;
pub mod loop_region;

pub use clip::{LoadError, PreparedClip};
pub use loop_region::LoopRegion;

pub use crate::stretch::MAX_BLOCK_FRAMES;

use std::path::PathBuf;

use serde::Serialize;

use crate::analysis::{BpmSource, MAX_BPM, MIN_BPM};
use crate::audio::AudioBuffer;
use crate::stretch::{clamp_ratio, default_stretcher, Stretcher};

/// Ratios this close to 1.0 play the clip directly
pub const DIRECT_PLAYBACK_TOLERANCE: f64 = 0.02;

/// Master tempo assumed before any track defines one
pub const DEFAULT_MASTER_BPM: f64 = 120.0;

/// Plain-data view of a track for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    /// Slot index
    pub index: usize,
    /// Clip name, empty when unloaded
    pub name: String,
    /// Source file
    pub path: Option<PathBuf>,
    /// Whether a clip is loaded
    pub loaded: bool,
    /// Clip length in seconds
    pub duration: f64,
    /// Playback cursor in seconds
    pub position: f64,
    /// Detected or manually entered tempo
    pub detected_bpm: f64,
    /// Where `detected_bpm` came from
    pub bpm_source: BpmSource,
    /// Time ratio applied during playback
    pub stretch_ratio: f64,
    /// Master tempo the track last saw
    pub master_bpm_ref: f64,
    /// Active loop region
    pub loop_region: Option<LoopRegion>,
    /// Mute flag
    pub muted: bool,
    /// Solo flag
    pub solo: bool,
    /// Loop flag
    pub looping: bool,
    /// Linear gain
    pub volume: f32,
    /// Channel count of the clip
    pub channels: usize,
    /// Peak envelope in [0, 1]
    pub peaks: Vec<f32>,
}

/// One looper track
pub struct Track {
    /// Slot index
    index: usize,
    /// Clip name
    name: String,
    /// Source file
    path: Option<PathBuf>,
    /// Decoded clip, empty when unloaded
    samples: AudioBuffer,
    /// Rate of `samples`
    sample_rate: u32,
    /// Peak envelope
    peaks: Vec<f32>,
    /// Tempo of the clip, 0 when unloaded
    detected_bpm: f64,
    /// Where `detected_bpm` came from
    bpm_source: BpmSource,
    /// Last master tempo propagated by the session
    master_bpm_ref: f64,
    /// Time ratio, always within the stretch limits
    stretch_ratio: f64,
    /// Playback cursor in seconds
    position: f64,
    /// Optional loop region
    loop_region: Option<LoopRegion>,
    muted: bool,
    solo: bool,
    looping: bool,
    volume: f32,
    /// Time-stretch backend
    stretcher: Box<dyn Stretcher>,
    /// True while the last rendered block used the stretcher
    stretching: bool,
    /// Stretcher output scratch, `MAX_BLOCK_FRAMES` long
    scratch: AudioBuffer,
}

impl Track {
    /// Create an empty track
    pub fn new(index: usize, sample_rate: u32) -> Self {
        Self {
            index,
            name: String::new(),
            path: None,
            samples: AudioBuffer::default(),
            sample_rate,
            peaks: Vec::new(),
            detected_bpm: 0.0,
            bpm_source: BpmSource::Default,
            master_bpm_ref: DEFAULT_MASTER_BPM,
            stretch_ratio: 1.0,
            position: 0.0,
            loop_region: None,
            muted: false,
            solo: false,
            looping: true,
            volume: 1.0,
            stretcher: default_stretcher(),
            stretching: false,
            scratch: AudioBuffer::default(),
        }
    }

    /// Install a prepared clip, resetting all derived state.
    ///
    /// Returns the clip now holding the previous buffers so the caller can
    /// drop them after releasing the track lock.
    pub fn install(&mut self, mut clip: PreparedClip) -> PreparedClip {
        std::mem::swap(&mut self.samples, &mut clip.buffer);
        std::mem::swap(&mut self.peaks, &mut clip.peaks);
        std::mem::swap(&mut self.stretcher, &mut clip.stretcher);
        std::mem::swap(&mut self.scratch, &mut clip.scratch);
        std::mem::swap(&mut self.name, &mut clip.name);
        std::mem::swap(&mut self.path, &mut clip.path);

        self.sample_rate = clip.sample_rate;
        self.detected_bpm = clip.bpm.bpm;
        self.bpm_source = clip.bpm.source;
        self.stretch_ratio = 1.0;
        self.position = 0.0;
        self.loop_region = None;
        self.stretching = false;
        clip
    }

    /// Slot index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Clip name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once a non-empty clip is installed
    pub fn is_loaded(&self) -> bool {
        !self.samples.is_empty()
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.num_frames() as f64 / self.sample_rate as f64
    }

    /// Clip sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decoded samples
    pub fn samples(&self) -> &AudioBuffer {
        &self.samples
    }

    /// Peak envelope
    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    /// Tempo of the clip
    pub fn detected_bpm(&self) -> f64 {
        self.detected_bpm
    }

    /// Where the tempo came from
    pub fn bpm_source(&self) -> BpmSource {
        self.bpm_source
    }

    /// Override the detected tempo.
    ///
    /// Rejected (returns false) outside [60, 200] or when nothing is loaded.
    pub fn set_manual_bpm(&mut self, bpm: f64) -> bool {
        if !self.is_loaded() || !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return false;
        }
        self.detected_bpm = bpm;
        self.bpm_source = BpmSource::Manual;
        true
    }

    /// Master tempo the track last saw
    pub fn master_bpm_ref(&self) -> f64 {
        self.master_bpm_ref
    }

    /// Record the session master tempo
    pub fn set_master_bpm_ref(&mut self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            self.master_bpm_ref = bpm;
        }
    }

    /// Time ratio applied during playback
    pub fn stretch_ratio(&self) -> f64 {
        self.stretch_ratio
    }

    /// Set the time ratio directly (clamped). Returns false (no change) for
    /// non-positive or non-finite values.
    pub fn set_stretch_ratio(&mut self, ratio: f64) -> bool {
        if !ratio.is_finite() || ratio <= 0.0 {
            return false;
        }
        self.stretch_ratio = clamp_ratio(ratio);
        true
    }

    /// Multiply the time ratio by `factor` (clamped)
    pub fn scale_stretch_ratio(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.stretch_ratio = clamp_ratio(self.stretch_ratio * factor);
        }
    }

    /// Set the ratio that maps the clip tempo onto the master tempo
    pub fn sync_to_master(&mut self) {
        if self.is_loaded() && self.detected_bpm > 0.0 && self.master_bpm_ref > 0.0 {
            self.stretch_ratio = clamp_ratio(self.detected_bpm / self.master_bpm_ref);
        }
    }

    /// Playback cursor in seconds
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Move the cursor (clamped to the clip). Returns false for a
    /// non-finite position.
    pub fn set_position(&mut self, seconds: f64) -> bool {
        if !seconds.is_finite() {
            return false;
        }
        self.position = seconds.clamp(0.0, self.duration());
        self.drop_stretch_state();
        true
    }

    /// Line the cursor up with the session transport.
    ///
    /// Tracks with a loop region keep their own position.
    pub fn align_to(&mut self, play_position: f64) {
        if self.loop_region.is_some() || !self.is_loaded() {
            return;
        }
        let duration = self.duration();
        self.position = if self.looping {
            play_position.rem_euclid(duration)
        } else {
            play_position.clamp(0.0, duration)
        };
        self.drop_stretch_state();
    }

    /// Active loop region
    pub fn loop_region(&self) -> Option<LoopRegion> {
        self.loop_region
    }

    /// Constrain playback to `[start, end)`.
    ///
    /// Returns false (no change) unless `0 <= start < end <= duration`.
    pub fn set_loop_region(&mut self, start: f64, end: f64) -> bool {
        let Some(region) = LoopRegion::new(start, end, self.duration()) else {
            return false;
        };
        self.loop_region = Some(region);
        if !region.contains(self.position) {
            self.position = region.start;
            self.drop_stretch_state();
        }
        true
    }

    /// Play the whole clip again
    pub fn clear_loop_region(&mut self) {
        self.loop_region = None;
        if self.position > self.duration() {
            self.position = 0.0;
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_soloed(&self) -> bool {
        self.solo
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Linear gain; the engine does not clamp it. Returns false for a
    /// non-finite gain.
    pub fn set_volume(&mut self, volume: f32) -> bool {
        if !volume.is_finite() {
            return false;
        }
        self.volume = volume;
        true
    }

    /// Rewind to the loop start (or 0) and drop stretch state
    pub fn reset(&mut self) {
        self.position = self.loop_region.map_or(0.0, |r| r.start);
        self.drop_stretch_state();
    }

    /// Plain-data view for display
    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            index: self.index,
            name: self.name.clone(),
            path: self.path.clone(),
            loaded: self.is_loaded(),
            duration: self.duration(),
            position: self.position,
            detected_bpm: self.detected_bpm,
            bpm_source: self.bpm_source,
            stretch_ratio: self.stretch_ratio,
            master_bpm_ref: self.master_bpm_ref,
            loop_region: self.loop_region,
            muted: self.muted,
            solo: self.solo,
            looping: self.looping,
            volume: self.volume,
            channels: self.samples.num_channels(),
            peaks: self.peaks.clone(),
        }
    }

    /// Active `[start, end)` frame bounds
    fn active_bounds(&self) -> (usize, usize) {
        let total = self.samples.num_frames();
        match self.loop_region {
            Some(region) => region.frame_bounds(self.sample_rate, total),
            None => (0, total),
        }
    }

    fn drop_stretch_state(&mut self) {
        if self.stretching {
            self.stretcher.clear();
            self.stretching = false;
        }
    }

    /// Mix `frame_count` frames of this track into `output` at `start_offset`.
    ///
    /// Silent when unloaded, muted or past the end of a non-looping clip.
    pub fn render_block(&mut self, output: &mut AudioBuffer, start_offset: usize, frame_count: usize) {
        let frame_count = frame_count.min(output.num_frames().saturating_sub(start_offset));
        if !self.is_loaded() || self.muted || frame_count == 0 || self.sample_rate == 0 {
            return;
        }

        let (lo, hi) = self.active_bounds();
        if hi <= lo {
            return;
        }

        let rate = self.sample_rate as f64;
        let mut index = ((self.position * rate).round().max(0.0) as usize).max(lo);
        if index >= hi {
            if !self.looping {
                return;
            }
            index = lo + (index - lo) % (hi - lo);
            self.drop_stretch_state();
        }

        let index = if (self.stretch_ratio - 1.0).abs() < DIRECT_PLAYBACK_TOLERANCE {
            self.drop_stretch_state();
            self.render_direct(output, start_offset, frame_count, index, lo, hi)
        } else {
            self.render_stretched(output, start_offset, frame_count, index, lo, hi)
        };

        self.position = index as f64 / rate;
    }

    /// Copy source frames straight through. Returns the new source index.
    fn render_direct(
        &mut self,
        output: &mut AudioBuffer,
        start_offset: usize,
        frame_count: usize,
        mut index: usize,
        lo: usize,
        hi: usize,
    ) -> usize {
        let mut written = 0;
        while written < frame_count {
            let count = (frame_count - written).min(hi - index);
            output.mix_from(&self.samples, index, start_offset + written, count, self.volume);
            written += count;
            index += count;
            if index >= hi {
                if !self.looping {
                    break;
                }
                index = lo;
            }
        }
        index
    }

    /// Feed the stretcher and mix what it produces. Returns the new source
    /// index, advanced by the input frames consumed.
    fn render_stretched(
        &mut self,
        output: &mut AudioBuffer,
        start_offset: usize,
        frame_count: usize,
        mut index: usize,
        lo: usize,
        hi: usize,
    ) -> usize {
        if !self.stretching {
            self.stretcher.clear();
            self.stretching = true;
        }
        self.stretcher.set_ratio(self.stretch_ratio);
        let ratio = self.stretcher.ratio();

        let mut written = 0;
        while written < frame_count {
            let chunk = (frame_count - written).min(self.scratch.num_frames());
            if chunk == 0 {
                break;
            }

            let mut wanted = (chunk as f64 / ratio).ceil() as usize;
            if self.stretcher.available() < chunk {
                wanted += self.stretcher.latency();
            }
            let fed = wanted.min(hi - index);
            self.stretcher.put(&self.samples, index, fed);
            index += fed;

            let produced = self.stretcher.retrieve(&mut self.scratch, chunk);
            output.mix_from(&self.scratch, 0, start_offset + written, produced, self.volume);
            written += chunk;

            if index >= hi {
                if self.looping {
                    index = lo;
                    self.stretcher.clear();
                }
                break;
            }
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 1000;

    fn constant_track(value: f32, seconds: f64) -> Track {
        let frames = (seconds * RATE as f64) as usize;
        let clip = PreparedClip::analyze(
            AudioBuffer::from_channels(vec![vec![value; frames]]),
            RATE,
            "tone",
        );
        let mut track = Track::new(0, RATE);
        track.install(clip);
        track
    }

    /// Sine track at `hz`, peak `amplitude`
    fn tone_track(amplitude: f32, hz: f32, seconds: f64) -> Track {
        let frames = (seconds * RATE as f64) as usize;
        let data = (0..frames)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * hz * i as f32 / RATE as f32).sin())
            .collect();
        let clip = PreparedClip::analyze(AudioBuffer::from_channels(vec![data]), RATE, "sine");
        let mut track = Track::new(0, RATE);
        track.install(clip);
        track
    }

    /// Track whose sample value equals its frame index
    fn ramp_track(frames: usize) -> Track {
        let data = (0..frames).map(|i| i as f32).collect();
        let clip = PreparedClip::analyze(AudioBuffer::from_channels(vec![data]), RATE, "ramp");
        let mut track = Track::new(0, RATE);
        track.install(clip);
        track
    }

    #[test]
    fn test_new_track_is_empty() {
        let track = Track::new(3, 44100);
        assert_eq!(track.index(), 3);
        assert!(!track.is_loaded());
        assert_eq!(track.detected_bpm(), 0.0);
        assert_eq!(track.stretch_ratio(), 1.0);
        assert!(track.is_looping());
        assert_eq!(track.volume(), 1.0);
    }

    #[test]
    fn test_unloaded_track_renders_silence() {
        let mut track = Track::new(0, RATE);
        let mut out = AudioBuffer::new(2, 64);
        track.render_block(&mut out, 0, 64);
        assert_eq!(out.peak(), 0.0);
        assert_eq!(track.position(), 0.0);
    }

    #[test]
    fn test_install_resets_state() {
        let mut track = constant_track(0.5, 2.0);
        track.set_stretch_ratio(2.0);
        track.set_loop_region(0.5, 1.0);
        track.set_position(0.75);

        let old = track.install(PreparedClip::analyze(AudioBuffer::new(1, 3000), RATE, "next"));
        assert_eq!(old.name, "tone");
        assert_eq!(old.buffer.num_frames(), 2000);
        assert_eq!(track.name(), "next");
        assert_eq!(track.stretch_ratio(), 1.0);
        assert_eq!(track.position(), 0.0);
        assert!(track.loop_region().is_none());
        assert_eq!(track.duration(), 3.0);
    }

    #[test]
    fn test_direct_render_mixes_with_volume() {
        let mut track = constant_track(0.5, 1.0);
        track.set_volume(0.5);
        let mut out = AudioBuffer::new(2, 100);
        track.render_block(&mut out, 0, 100);
        assert!(out.channel(0).iter().all(|&s| (s - 0.25).abs() < 1e-6));
        // Mono duplicated into the second channel
        assert!(out.channel(1).iter().all(|&s| (s - 0.25).abs() < 1e-6));
        assert!((track.position() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_render_respects_start_offset() {
        let mut track = constant_track(1.0, 1.0);
        let mut out = AudioBuffer::new(1, 10);
        track.render_block(&mut out, 6, 10);
        assert_eq!(out.channel(0), &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        assert!((track.position() - 0.004).abs() < 1e-9);
    }

    #[test]
    fn test_muted_track_is_silent_and_frozen() {
        let mut track = constant_track(1.0, 1.0);
        track.set_muted(true);
        let mut out = AudioBuffer::new(1, 10);
        track.render_block(&mut out, 0, 10);
        assert_eq!(out.peak(), 0.0);
        assert_eq!(track.position(), 0.0);
    }

    #[test]
    fn test_direct_loop_wraps_without_gap() {
        let mut track = ramp_track(10);
        let mut out = AudioBuffer::new(1, 25);
        track.render_block(&mut out, 0, 25);
        let expected: Vec<f32> = (0..25).map(|i| (i % 10) as f32).collect();
        assert_eq!(out.channel(0), expected.as_slice());
        assert!((track.position() - 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_non_looping_track_stops_at_end() {
        let mut track = ramp_track(10);
        track.set_looping(false);
        let mut out = AudioBuffer::new(1, 16);
        track.render_block(&mut out, 0, 16);
        assert_eq!(&out.channel(0)[10..], &[0.0; 6]);
        assert!((track.position() - 0.01).abs() < 1e-9);

        let mut out = AudioBuffer::new(1, 16);
        track.render_block(&mut out, 0, 16);
        assert_eq!(out.peak(), 0.0);
        assert!((track.position() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_loop_region_bounds_rendered_indices() {
        let mut track = ramp_track(1000);
        assert!(track.set_loop_region(0.2, 0.3));
        assert!((track.position() - 0.2).abs() < 1e-9);

        for _ in 0..20 {
            let mut out = AudioBuffer::new(1, 37);
            track.render_block(&mut out, 0, 37);
            for &s in out.channel(0) {
                assert!((200.0..300.0).contains(&s), "index {} escaped region", s);
            }
        }
    }

    #[test]
    fn test_invalid_loop_region_rejected() {
        let mut track = constant_track(0.1, 1.0);
        assert!(!track.set_loop_region(0.5, 0.5));
        assert!(!track.set_loop_region(0.5, 1.5));
        assert!(track.loop_region().is_none());
    }

    #[test]
    fn test_loop_region_keeps_position_inside() {
        let mut track = constant_track(0.1, 1.0);
        track.set_position(0.4);
        assert!(track.set_loop_region(0.25, 0.75));
        assert!((track.position() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_clear_loop_region_is_idempotent() {
        let mut track = constant_track(0.1, 1.0);
        track.set_loop_region(0.25, 0.75);
        track.clear_loop_region();
        let once = track.snapshot();
        track.clear_loop_region();
        assert_eq!(track.snapshot(), once);
        assert!(once.loop_region.is_none());
    }

    #[test]
    fn test_reset_returns_to_region_start() {
        let mut track = constant_track(0.1, 1.0);
        track.set_loop_region(0.25, 0.75);
        track.set_position(0.5);
        track.reset();
        assert!((track.position() - 0.25).abs() < 1e-9);
        track.clear_loop_region();
        track.reset();
        assert_eq!(track.position(), 0.0);
    }

    #[test]
    fn test_stretch_ratio_is_clamped() {
        let mut track = constant_track(0.1, 1.0);
        assert!(track.set_stretch_ratio(10.0));
        assert_eq!(track.stretch_ratio(), 4.0);
        track.scale_stretch_ratio(0.01);
        assert_eq!(track.stretch_ratio(), 0.25);
        assert!(!track.set_stretch_ratio(f64::NAN));
        assert!(!track.set_stretch_ratio(-2.0));
        assert!(!track.set_stretch_ratio(0.0));
        assert_eq!(track.stretch_ratio(), 0.25);
        track.scale_stretch_ratio(-1.0);
        assert_eq!(track.stretch_ratio(), 0.25);
    }

    #[test]
    fn test_non_finite_controls_rejected() {
        let mut track = constant_track(0.1, 1.0);
        assert!(track.set_volume(0.5));
        assert!(!track.set_volume(f32::NAN));
        assert!(!track.set_volume(f32::INFINITY));
        assert_eq!(track.volume(), 0.5);

        assert!(track.set_position(0.4));
        assert!(!track.set_position(f64::NAN));
        assert!((track.position() - 0.4).abs() < 1e-9);
        assert!(track.set_position(-1.0));
        assert_eq!(track.position(), 0.0);
    }

    #[test]
    fn test_sync_to_master() {
        let mut track = constant_track(0.1, 2.0);
        assert!(track.set_manual_bpm(80.0));
        track.set_master_bpm_ref(100.0);
        track.sync_to_master();
        assert!((track.stretch_ratio() - 0.8).abs() < 1e-9);
        assert_eq!(track.bpm_source(), BpmSource::Manual);
    }

    #[test]
    fn test_manual_bpm_range() {
        let mut track = constant_track(0.1, 2.0);
        let before = track.detected_bpm();
        assert!(!track.set_manual_bpm(59.0));
        assert!(!track.set_manual_bpm(201.0));
        assert_eq!(track.detected_bpm(), before);
        assert!(!Track::new(0, RATE).set_manual_bpm(100.0));
    }

    #[test]
    fn test_stretched_render_advances_by_input() {
        let mut track = tone_track(0.5, 50.0, 10.0);
        assert!(track.set_stretch_ratio(2.0));
        let mut produced = 0.0f32;
        let mut last = 0.0;
        for _ in 0..40 {
            let mut out = AudioBuffer::new(1, 256);
            track.render_block(&mut out, 0, 256);
            produced += out.peak();
            assert!(track.position() >= last);
            last = track.position();
        }
        assert!(produced > 0.0);
        // Roughly half as much input as output, plus stretcher latency
        let consumed = track.position() * RATE as f64;
        assert!(consumed < 40.0 * 256.0, "consumed {}", consumed);
        assert!(consumed > 40.0 * 256.0 / 2.0 - 1.0);
    }

    #[test]
    fn test_stretched_loop_region_bounds() {
        let mut track = tone_track(0.5, 50.0, 5.0);
        assert!(track.set_loop_region(2.0, 3.0));
        assert!(track.set_stretch_ratio(1.5));
        for _ in 0..200 {
            let mut out = AudioBuffer::new(1, 256);
            track.render_block(&mut out, 0, 256);
            let position = track.position();
            assert!(
                (2.0..3.0).contains(&position),
                "position {} left the region",
                position
            );
        }
    }

    #[test]
    fn test_align_to_transport() {
        let mut track = constant_track(0.1, 2.0);
        track.align_to(5.0);
        assert!((track.position() - 1.0).abs() < 1e-9);

        track.set_looping(false);
        track.align_to(5.0);
        assert!((track.position() - 2.0).abs() < 1e-9);

        track.set_loop_region(0.5, 1.0);
        track.align_to(0.1);
        assert!((track.position() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_reports_state() {
        let mut track = constant_track(0.3, 1.0);
        track.set_solo(true);
        let snapshot = track.snapshot();
        assert!(snapshot.loaded);
        assert!(snapshot.solo);
        assert_eq!(snapshot.name, "tone");
        assert_eq!(snapshot.channels, 1);
        assert_eq!(snapshot.peaks.len(), 100);
        assert!((snapshot.peaks[0] - 0.3).abs() < 1e-6);
    }
}
