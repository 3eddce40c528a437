// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! The looper session and real-time mixer.
//!
//! A [`Session`] owns a fixed set of tracks and the transport. It is shared
//! behind an `Arc`: the audio thread calls [`Session::mix_block`] once per
//! device buffer while control code loads clips, changes tempo and edits
//! track settings.
//!
//! Locking:
//! - the transport lock is always taken before any track lock
//! - `mix_block` holds the transport lock for the whole block, so a tempo
//!   change rescales every track between blocks, never during one
//! - file decoding and analysis happen before any lock is taken

pub mod command;
pub mod metronome;
pub mod recorder;
pub mod transport;

pub use command::{CommandOutcome, SessionCommand};
pub use metronome::Metronome;
pub use recorder::{RecordError, RecordedTake, Recorder, DEFAULT_MAX_RECORD_SECONDS};
pub use transport::{Transport, TransportState};

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::analysis::{MAX_BPM, MIN_BPM};
use crate::audio::{AudioBuffer, AudioDecoder, WavDecoder};
use crate::track::{LoadError, PreparedClip, Track, TrackSnapshot, DEFAULT_MASTER_BPM};

use self::metronome::DEFAULT_CLICK_GAIN;

/// Default number of track slots
pub const DEFAULT_TRACK_COUNT: usize = 8;

/// Session settings
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Output sample rate; clips are converted to it on load
    pub sample_rate: u32,
    /// Output channel count, used for recorded takes
    pub channels: usize,
    /// Number of track slots
    pub track_count: usize,
    /// Master tempo before any clip defines one
    pub initial_tempo: f64,
    /// Start with the metronome on
    pub metronome: bool,
    /// Metronome click gain
    pub click_gain: f32,
    /// Sync each ordinary load to the master tempo
    pub auto_sync_on_load: bool,
    /// Take buffer capacity in seconds
    pub max_record_seconds: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            track_count: DEFAULT_TRACK_COUNT,
            initial_tempo: DEFAULT_MASTER_BPM,
            metronome: false,
            click_gain: DEFAULT_CLICK_GAIN,
            auto_sync_on_load: true,
            max_record_seconds: DEFAULT_MAX_RECORD_SECONDS,
        }
    }
}

/// What a load did to the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// The clip is the only loaded one; its tempo became the master tempo
    SessionDefining { bpm: f64 },
    /// Another clip already defined the tempo
    Ordinary { bpm: f64, stretch_ratio: f64 },
}

impl LoadOutcome {
    /// Tempo of the loaded clip
    pub fn bpm(&self) -> f64 {
        match self {
            LoadOutcome::SessionDefining { bpm } | LoadOutcome::Ordinary { bpm, .. } => *bpm,
        }
    }
}

/// Lock a mutex, recovering the data if another thread panicked holding it
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A multitrack looper session
pub struct Session {
    config: SessionConfig,
    tracks: Vec<Mutex<Track>>,
    transport: Mutex<Transport>,
    decoder: Box<dyn AudioDecoder>,
}

impl Session {
    /// Create a session that decodes WAV files
    pub fn new(config: SessionConfig) -> Self {
        Self::with_decoder(config, Box::new(WavDecoder::new()))
    }

    /// Create a session with a custom decoder
    pub fn with_decoder(config: SessionConfig, decoder: Box<dyn AudioDecoder>) -> Self {
        let tracks = (0..config.track_count)
            .map(|i| Mutex::new(Track::new(i, config.sample_rate)))
            .collect();
        let mut transport = Transport::new(config.initial_tempo, config.click_gain);
        transport.metronome.set_enabled(config.metronome);

        let session = Self {
            tracks,
            transport: Mutex::new(transport),
            decoder,
            config,
        };
        let tempo = session.master_tempo();
        for track in &session.tracks {
            lock(track).set_master_bpm_ref(tempo);
        }
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Number of track slots
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn check_slot(&self, index: usize) -> Result<(), LoadError> {
        if index < self.tracks.len() {
            Ok(())
        } else {
            Err(LoadError::InvalidSlot {
                index,
                capacity: self.tracks.len(),
            })
        }
    }

    /// Decode, analyze and install `path` into track `index`.
    ///
    /// On failure the track is left as it was.
    pub fn load_file(&self, index: usize, path: &Path) -> Result<LoadOutcome, LoadError> {
        self.check_slot(index)?;
        let clip = PreparedClip::from_file(self.decoder.as_ref(), path, self.sample_rate())
            .map_err(|e| {
                tracing::warn!(track = index, path = %path.display(), "load failed: {}", e);
                e
            })?;
        self.load_clip(index, clip)
    }

    /// Install an already prepared clip into track `index`
    pub fn load_clip(&self, index: usize, clip: PreparedClip) -> Result<LoadOutcome, LoadError> {
        self.check_slot(index)?;
        let clip = if clip.sample_rate == self.sample_rate() {
            clip
        } else {
            let decoded = crate::audio::DecodedAudio {
                sample_rate: clip.sample_rate,
                name: clip.name.clone(),
                buffer: clip.buffer,
            };
            let path = clip.path;
            let mut converted = PreparedClip::from_decoded(decoded, self.sample_rate())?;
            converted.path = path;
            converted
        };
        let name = clip.name.clone();

        let (outcome, retired) = {
            let mut transport = lock(&self.transport);
            let retired = lock(&self.tracks[index]).install(clip);
            (self.settle_load(&mut transport, index), retired)
        };
        drop(retired);

        match outcome {
            LoadOutcome::SessionDefining { bpm } => {
                tracing::info!(track = index, %name, bpm, "clip defines session tempo");
            }
            LoadOutcome::Ordinary { bpm, stretch_ratio } => {
                tracing::info!(track = index, %name, bpm, stretch_ratio, "clip loaded");
            }
        }
        Ok(outcome)
    }

    /// Apply the tempo policy after track `index` received a new clip
    pub fn on_track_loaded(&self, index: usize) -> Option<LoadOutcome> {
        if index >= self.tracks.len() || !lock(&self.tracks[index]).is_loaded() {
            return None;
        }
        let mut transport = lock(&self.transport);
        Some(self.settle_load(&mut transport, index))
    }

    fn settle_load(&self, transport: &mut Transport, index: usize) -> LoadOutcome {
        let loaded = self.tracks.iter().filter(|t| lock(*t).is_loaded()).count();
        let bpm = lock(&self.tracks[index]).detected_bpm();

        if loaded == 1 && bpm.is_finite() && bpm > 0.0 {
            transport.define_tempo(bpm);
            lock(&self.tracks[index]).set_stretch_ratio(1.0);
            for track in &self.tracks {
                lock(track).set_master_bpm_ref(bpm);
            }
            return LoadOutcome::SessionDefining { bpm };
        }

        let mut track = lock(&self.tracks[index]);
        track.set_master_bpm_ref(transport.master_tempo());
        if self.config.auto_sync_on_load {
            track.sync_to_master();
        }
        LoadOutcome::Ordinary {
            bpm,
            stretch_ratio: track.stretch_ratio(),
        }
    }

    /// Change the master tempo, rescaling every loaded track's ratio by
    /// `bpm / current master`. Returns false for non-positive tempos.
    pub fn set_tempo(&self, bpm: f64) -> bool {
        if !bpm.is_finite() || bpm <= 0.0 {
            tracing::warn!(bpm, "rejected tempo");
            return false;
        }
        let mut transport = lock(&self.transport);
        let scale = transport.change_tempo(bpm);
        for track in &self.tracks {
            let mut track = lock(track);
            if track.is_loaded() {
                track.scale_stretch_ratio(scale);
            }
            track.set_master_bpm_ref(bpm);
        }
        tracing::info!(bpm, scale, "master tempo changed");
        true
    }

    /// Set the master tempo to the mean tempo of the loaded tracks.
    ///
    /// Only tempos strictly inside (60, 200) count. Returns the new tempo.
    pub fn auto_sync_tracks(&self) -> Option<f64> {
        let bpms: Vec<f64> = self
            .tracks
            .iter()
            .filter_map(|t| {
                let track = lock(t);
                let bpm = track.detected_bpm();
                (track.is_loaded() && bpm > MIN_BPM && bpm < MAX_BPM).then_some(bpm)
            })
            .collect();
        if bpms.is_empty() {
            return None;
        }
        let average = bpms.iter().sum::<f64>() / bpms.len() as f64;
        self.set_tempo(average).then_some(average)
    }

    /// Real-time mix callback.
    ///
    /// Overwrites the first `frame_count` frames of `output` with the track
    /// mix plus metronome. Silent while stopped.
    pub fn mix_block(&self, output: &mut AudioBuffer, frame_count: usize) {
        let frame_count = frame_count.min(output.num_frames());
        output.clear_range(0, frame_count);

        let mut transport = lock(&self.transport);
        if !transport.is_playing() || frame_count == 0 {
            return;
        }

        let any_solo = self.tracks.iter().any(|t| {
            let track = lock(t);
            track.is_loaded() && track.is_soloed()
        });

        for track in &self.tracks {
            let mut track = lock(track);
            if !track.is_loaded() || track.is_muted() || (any_solo && !track.is_soloed()) {
                continue;
            }
            track.render_block(output, 0, frame_count);
        }

        if let Some(recorder) = transport.recorder.as_mut() {
            recorder.capture(output, frame_count);
        }

        let sample_rate = self.sample_rate();
        let position = transport.play_position();
        transport
            .metronome
            .render(output, frame_count, position, sample_rate);
        transport.advance(frame_count, sample_rate);
    }

    /// Toggle playback. Returns true if now playing.
    ///
    /// Starting playback lines every track without a loop region up with the
    /// transport position.
    pub fn play(&self) -> bool {
        let mut transport = lock(&self.transport);
        let playing = transport.toggle_play();
        if playing {
            let position = transport.play_position();
            for track in &self.tracks {
                lock(track).align_to(position);
            }
        }
        tracing::info!(playing, position = transport.play_position(), "transport");
        playing
    }

    /// Stop and rewind everything
    pub fn stop(&self) {
        let mut transport = lock(&self.transport);
        transport.stop();
        for track in &self.tracks {
            lock(track).reset();
        }
        tracing::info!("transport stopped");
    }

    /// Toggle recording.
    ///
    /// Arming allocates the take buffer; disarming returns the take.
    pub fn record(&self) -> Option<RecordedTake> {
        let armed = lock(&self.transport).is_recording();
        if armed {
            let recorder = lock(&self.transport).recorder.take();
            let take = recorder.map(Recorder::finish);
            if let Some(take) = &take {
                tracing::info!(seconds = take.duration(), truncated = take.truncated, "recording finished");
            }
            take
        } else {
            let recorder = Recorder::new(
                self.config.channels,
                self.sample_rate(),
                self.config.max_record_seconds,
            );
            let mut transport = lock(&self.transport);
            if transport.recorder.is_none() {
                transport.recorder = Some(recorder);
                tracing::info!(max_seconds = self.config.max_record_seconds, "recording armed");
            }
            None
        }
    }

    /// Toggle the metronome. Returns the new state.
    pub fn toggle_metronome(&self) -> bool {
        let enabled = lock(&self.transport).metronome.toggle();
        tracing::debug!(enabled, "metronome");
        enabled
    }

    /// Turn the metronome on or off
    pub fn set_metronome(&self, enabled: bool) {
        lock(&self.transport).metronome.set_enabled(enabled);
    }

    /// Change the click gain
    pub fn set_click_gain(&self, gain: f32) {
        lock(&self.transport).metronome.set_click_gain(gain);
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.transport).is_playing()
    }

    pub fn is_recording(&self) -> bool {
        lock(&self.transport).is_recording()
    }

    pub fn metronome_enabled(&self) -> bool {
        lock(&self.transport).metronome.is_enabled()
    }

    /// Current master tempo
    pub fn master_tempo(&self) -> f64 {
        lock(&self.transport).master_tempo()
    }

    /// Master tempo before the last change
    pub fn previous_master_tempo(&self) -> f64 {
        lock(&self.transport).previous_master_tempo()
    }

    /// Transport position in seconds
    pub fn play_position(&self) -> f64 {
        lock(&self.transport).play_position()
    }

    /// Run `f` on track `index` under its lock
    pub fn with_track<R>(&self, index: usize, f: impl FnOnce(&mut Track) -> R) -> Option<R> {
        self.tracks.get(index).map(|t| f(&mut lock(t)))
    }

    /// Snapshot of one track
    pub fn snapshot(&self, index: usize) -> Option<TrackSnapshot> {
        self.with_track(index, |t| t.snapshot())
    }

    /// Snapshots of every track
    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        self.tracks.iter().map(|t| lock(t).snapshot()).collect()
    }

    /// Number of tracks holding a clip
    pub fn loaded_count(&self) -> usize {
        self.tracks.iter().filter(|t| lock(*t).is_loaded()).count()
    }

    pub fn set_volume(&self, index: usize, volume: f32) -> bool {
        let accepted = self
            .with_track(index, |t| t.set_volume(volume))
            .unwrap_or(false);
        if !accepted {
            tracing::warn!(track = index, volume, "rejected volume");
        }
        accepted
    }

    pub fn set_muted(&self, index: usize, muted: bool) -> bool {
        self.with_track(index, |t| t.set_muted(muted)).is_some()
    }

    pub fn set_solo(&self, index: usize, solo: bool) -> bool {
        self.with_track(index, |t| t.set_solo(solo)).is_some()
    }

    pub fn set_looping(&self, index: usize, looping: bool) -> bool {
        self.with_track(index, |t| t.set_looping(looping)).is_some()
    }

    /// Set a loop region; false if the track or region is invalid
    pub fn set_loop_region(&self, index: usize, start: f64, end: f64) -> bool {
        let accepted = self
            .with_track(index, |t| t.set_loop_region(start, end))
            .unwrap_or(false);
        if accepted {
            tracing::debug!(track = index, start, end, "loop region set");
        } else {
            tracing::warn!(track = index, start, end, "rejected loop region");
        }
        accepted
    }

    pub fn clear_loop_region(&self, index: usize) -> bool {
        self.with_track(index, |t| t.clear_loop_region()).is_some()
    }

    /// Override a track's time ratio (clamped); false for a non-positive or
    /// non-finite ratio
    pub fn set_stretch_ratio(&self, index: usize, ratio: f64) -> bool {
        let accepted = self
            .with_track(index, |t| t.set_stretch_ratio(ratio))
            .unwrap_or(false);
        if !accepted {
            tracing::warn!(track = index, ratio, "rejected stretch ratio");
        }
        accepted
    }

    pub fn set_position(&self, index: usize, seconds: f64) -> bool {
        let accepted = self
            .with_track(index, |t| t.set_position(seconds))
            .unwrap_or(false);
        if !accepted {
            tracing::warn!(track = index, seconds, "rejected position");
        }
        accepted
    }

    /// Correct a track's tempo by hand.
    ///
    /// Rejected outside [60, 200]. With sync-on-load enabled the track is
    /// re-synced to the master tempo.
    pub fn set_manual_bpm(&self, index: usize, bpm: f64) -> bool {
        let accepted = self
            .with_track(index, |t| {
                let accepted = t.set_manual_bpm(bpm);
                if accepted && self.config.auto_sync_on_load {
                    t.sync_to_master();
                }
                accepted
            })
            .unwrap_or(false);
        if !accepted {
            tracing::warn!(track = index, bpm, "rejected manual tempo");
        }
        accepted
    }
}
