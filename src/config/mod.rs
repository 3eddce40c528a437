// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Session files.
//!
//! A session file names the clips to load and the mixer settings to apply
//! to them. YAML is the default format; files ending in `.toml` are read and
//! written as TOML.
//!
//! ```yaml
//! session:
//!   name: "Jam"
//!   tempo: 96
//!   metronome: true
//! audio:
//!   sample_rate: 48000
//! tracks:
//!   - file: "loops/drums.wav"
//!     volume: 0.8
//!   - file: "loops/bass.wav"
//!     bpm: 96
//!     loop_region: [0.0, 2.5]
//! ```

pub mod watcher;

pub use watcher::{validate_config, ConfigEvent, ConfigWatcher};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::{MAX_BPM, MIN_BPM};
use crate::audio::AudioConfig;
use crate::session::{
    LoadOutcome, Session, SessionConfig, DEFAULT_MAX_RECORD_SECONDS, DEFAULT_TRACK_COUNT,
};
use crate::stretch::{MAX_STRETCH_RATIO, MIN_STRETCH_RATIO};
use crate::track::LoadError;

/// Root of a session file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LooperConfig {
    /// Session-wide settings
    #[serde(default)]
    pub session: SessionSettings,
    /// Output device settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Clips, one per track slot in order
    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
}

impl LooperConfig {
    /// Load a session file, picking the format from the extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {:?}", path))?;
        if is_toml(path) {
            Self::from_toml(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    /// Parse from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML session")
    }

    /// Parse from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML session")
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize session to YAML")
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize session to TOML")
    }

    /// Save, picking the format from the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_toml(path) {
            self.to_toml()?
        } else {
            self.to_yaml()?
        };
        fs::write(path, text).with_context(|| format!("Failed to write session file: {:?}", path))
    }

    /// Human-readable problems; empty when the file is usable
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let s = &self.session;

        if let Some(tempo) = s.tempo {
            if !(tempo.is_finite() && tempo > 0.0) {
                problems.push(format!("session tempo must be positive, got {}", tempo));
            }
        }
        if s.track_count == 0 {
            problems.push("track_count must be at least 1".to_string());
        }
        if self.tracks.len() > s.track_count {
            problems.push(format!(
                "{} tracks listed but track_count is {}",
                self.tracks.len(),
                s.track_count
            ));
        }
        if !(s.click_gain.is_finite() && s.click_gain >= 0.0) {
            problems.push(format!("click_gain must be non-negative, got {}", s.click_gain));
        }
        if self.audio.sample_rate == 0 {
            problems.push("audio sample_rate must be non-zero".to_string());
        }
        if self.audio.channels == 0 {
            problems.push("audio channels must be non-zero".to_string());
        }

        for (i, track) in self.tracks.iter().enumerate() {
            if track.file.as_os_str().is_empty() {
                problems.push(format!("track {}: file is empty", i + 1));
            }
            if let Some(bpm) = track.bpm {
                if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
                    problems.push(format!(
                        "track {}: bpm {} outside {}..{}",
                        i + 1,
                        bpm,
                        MIN_BPM,
                        MAX_BPM
                    ));
                }
            }
            if let Some([start, end]) = track.loop_region {
                if !(start >= 0.0 && start < end) {
                    problems.push(format!(
                        "track {}: loop region [{}, {}] is empty or negative",
                        i + 1,
                        start,
                        end
                    ));
                }
            }
            if let Some(ratio) = track.stretch_ratio {
                if !(MIN_STRETCH_RATIO..=MAX_STRETCH_RATIO).contains(&ratio) {
                    problems.push(format!(
                        "track {}: stretch_ratio {} outside {}..{}",
                        i + 1,
                        ratio,
                        MIN_STRETCH_RATIO,
                        MAX_STRETCH_RATIO
                    ));
                }
            }
        }
        problems
    }

    /// Session parameters for constructing a [`Session`]
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels as usize,
            track_count: self.session.track_count.max(self.tracks.len()),
            initial_tempo: self.session.tempo.unwrap_or(defaults.initial_tempo),
            metronome: self.session.metronome,
            click_gain: self.session.click_gain,
            auto_sync_on_load: self.session.auto_sync_on_load,
            max_record_seconds: self.session.max_record_seconds,
        }
    }

    /// Track files resolved against `base_dir`
    pub fn track_paths(&self, base_dir: &Path) -> Vec<PathBuf> {
        self.tracks
            .iter()
            .map(|t| {
                if t.file.is_absolute() {
                    t.file.clone()
                } else {
                    base_dir.join(&t.file)
                }
            })
            .collect()
    }

    /// Load every listed clip into `session`, then apply the mixer settings.
    ///
    /// Returns one load result per listed track.
    pub fn load_into(
        &self,
        session: &Session,
        base_dir: &Path,
    ) -> Vec<Result<LoadOutcome, LoadError>> {
        let results = self
            .track_paths(base_dir)
            .iter()
            .enumerate()
            .map(|(i, path)| session.load_file(i, path))
            .collect();
        self.apply_settings(session);
        results
    }

    /// Re-apply mixer settings without reloading audio
    pub fn apply_settings(&self, session: &Session) {
        for (i, entry) in self.tracks.iter().enumerate() {
            if let Some(bpm) = entry.bpm {
                session.set_manual_bpm(i, bpm);
            }
        }
        if let Some(tempo) = self.session.tempo {
            session.set_tempo(tempo);
        }
        session.set_metronome(self.session.metronome);
        session.set_click_gain(self.session.click_gain);

        for (i, entry) in self.tracks.iter().enumerate() {
            session.set_volume(i, entry.volume);
            session.set_muted(i, entry.muted);
            session.set_solo(i, entry.solo);
            session.set_looping(i, entry.looping);
            match entry.loop_region {
                Some([start, end]) => {
                    session.set_loop_region(i, start, end);
                }
                None => {
                    session.clear_loop_region(i);
                }
            }
            if let Some(ratio) = entry.stretch_ratio {
                session.set_stretch_ratio(i, ratio);
            }
        }
        tracing::debug!(name = %self.session.name, "session settings applied");
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "toml")
}

/// Session-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    /// Session name
    #[serde(default = "default_name")]
    pub name: String,
    /// Master tempo applied after loading; omit to let the first clip decide
    #[serde(default)]
    pub tempo: Option<f64>,
    /// Metronome on at start
    #[serde(default)]
    pub metronome: bool,
    /// Metronome click gain
    #[serde(default = "default_click_gain")]
    pub click_gain: f32,
    /// Sync each new clip to the master tempo
    #[serde(default = "default_true")]
    pub auto_sync_on_load: bool,
    /// Number of track slots
    #[serde(default = "default_track_count")]
    pub track_count: usize,
    /// Take buffer capacity in seconds
    #[serde(default = "default_max_record_seconds")]
    pub max_record_seconds: f64,
}

fn default_name() -> String {
    "Untitled".to_string()
}
fn default_click_gain() -> f32 {
    0.5
}
fn default_true() -> bool {
    true
}
fn default_track_count() -> usize {
    DEFAULT_TRACK_COUNT
}
fn default_max_record_seconds() -> f64 {
    DEFAULT_MAX_RECORD_SECONDS
}
fn default_volume() -> f32 {
    1.0
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            tempo: None,
            metronome: false,
            click_gain: default_click_gain(),
            auto_sync_on_load: true,
            track_count: default_track_count(),
            max_record_seconds: default_max_record_seconds(),
        }
    }
}

/// One clip and its mixer settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackEntry {
    /// Audio file, relative to the session file
    pub file: PathBuf,
    /// Linear gain
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default = "default_true")]
    pub looping: bool,
    /// Tempo correction for a misdetected clip
    #[serde(default)]
    pub bpm: Option<f64>,
    /// Loop region `[start, end]` in seconds
    #[serde(default)]
    pub loop_region: Option<[f64; 2]>,
    /// Fixed time ratio, overriding sync
    #[serde(default)]
    pub stretch_ratio: Option<f64>,
}

impl TrackEntry {
    /// Entry for `file` with default settings
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            volume: default_volume(),
            muted: false,
            solo: false,
            looping: true,
            bpm: None,
            loop_region: None,
            stretch_ratio: None,
        }
    }
}
