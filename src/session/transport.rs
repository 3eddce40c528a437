// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Session transport: play state, timeline position and master tempo.

use super::metronome::Metronome;
use super::recorder::Recorder;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// Everything guarded by the session-level lock
#[derive(Debug)]
pub struct Transport {
    /// Current state
    state: TransportState,
    /// Timeline position in seconds, advances only while playing
    play_position: f64,
    /// Master tempo in BPM, always positive
    master_tempo: f64,
    /// Master tempo before the last change
    previous_master_tempo: f64,
    /// Click generator
    pub(super) metronome: Metronome,
    /// Take being captured, present while recording
    pub(super) recorder: Option<Recorder>,
}

impl Transport {
    /// Create a stopped transport at `bpm`
    pub fn new(bpm: f64, click_gain: f32) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { 120.0 };
        Self {
            state: TransportState::Stopped,
            play_position: 0.0,
            master_tempo: bpm,
            previous_master_tempo: bpm,
            metronome: Metronome::new(bpm, click_gain),
            recorder: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Timeline position in seconds
    pub fn play_position(&self) -> f64 {
        self.play_position
    }

    /// Position in beats at the master tempo
    pub fn beat_position(&self) -> f64 {
        self.play_position * self.master_tempo / 60.0
    }

    pub fn master_tempo(&self) -> f64 {
        self.master_tempo
    }

    pub fn previous_master_tempo(&self) -> f64 {
        self.previous_master_tempo
    }

    /// Adopt `bpm` as both current and previous tempo, with no rescaling
    pub(super) fn define_tempo(&mut self, bpm: f64) {
        self.master_tempo = bpm;
        self.previous_master_tempo = bpm;
        self.metronome.set_bpm(bpm);
    }

    /// Move to `bpm`, returning the factor existing ratios must be scaled by
    pub(super) fn change_tempo(&mut self, bpm: f64) -> f64 {
        self.previous_master_tempo = self.master_tempo;
        self.master_tempo = bpm;
        self.metronome.set_bpm(bpm);
        bpm / self.previous_master_tempo
    }

    /// Flip between playing and stopped, returning true if now playing
    pub(super) fn toggle_play(&mut self) -> bool {
        self.state = match self.state {
            TransportState::Stopped => TransportState::Playing,
            TransportState::Playing => TransportState::Stopped,
        };
        self.is_playing()
    }

    /// Stop and rewind to the start of the timeline
    pub(super) fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.play_position = 0.0;
        self.metronome.reset();
    }

    /// Advance the timeline by one block
    pub(super) fn advance(&mut self, frames: usize, sample_rate: u32) {
        if sample_rate > 0 {
            self.play_position += frames as f64 / sample_rate as f64;
        }
    }
}
