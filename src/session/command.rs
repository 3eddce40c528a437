// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Command interface for presentation layers.
//!
//! Every control a front end offers maps to one [`SessionCommand`]. Commands
//! are plain data, so a host can queue them from any thread and apply them
//! on its control thread with [`Session::apply`].

use std::path::PathBuf;

use super::{LoadOutcome, RecordedTake, Session};
use crate::track::LoadError;

/// A control-thread request
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Load a file into a track
    Load { track: usize, path: PathBuf },
    SetVolume { track: usize, volume: f32 },
    SetMuted { track: usize, muted: bool },
    SetSolo { track: usize, solo: bool },
    SetLooping { track: usize, looping: bool },
    SetLoopRegion { track: usize, start: f64, end: f64 },
    ClearLoopRegion { track: usize },
    /// Override a track's time ratio
    SetStretchRatio { track: usize, ratio: f64 },
    /// Correct a track's detected tempo
    SetManualBpm { track: usize, bpm: f64 },
    SetPosition { track: usize, seconds: f64 },
    /// Toggle playback
    Play,
    Stop,
    /// Toggle recording
    Record,
    SetTempo(f64),
    /// Set the master tempo to the mean of the loaded tracks
    AutoSync,
    ToggleMetronome,
}

/// Result of applying a command
#[derive(Debug)]
pub enum CommandOutcome {
    /// The command took effect
    Applied,
    /// Invalid parameter or track; nothing changed
    Rejected,
    /// A clip was installed
    Loaded(LoadOutcome),
    /// The clip could not be loaded; the track is unchanged
    LoadFailed(LoadError),
    /// Transport toggled
    Transport { playing: bool },
    /// Recording toggled; carries the take when recording stopped
    Recording(Option<RecordedTake>),
    /// Tempo changed
    Tempo(f64),
    /// Metronome toggled
    Metronome(bool),
}

impl CommandOutcome {
    fn from_flag(accepted: bool) -> Self {
        if accepted {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Rejected
        }
    }

    /// False for rejected commands and failed loads
    pub fn is_success(&self) -> bool {
        !matches!(self, CommandOutcome::Rejected | CommandOutcome::LoadFailed(_))
    }
}

impl Session {
    /// Route a command to the matching operation
    pub fn apply(&self, command: SessionCommand) -> CommandOutcome {
        tracing::debug!(?command, "applying command");
        match command {
            SessionCommand::Load { track, path } => match self.load_file(track, &path) {
                Ok(outcome) => CommandOutcome::Loaded(outcome),
                Err(e) => CommandOutcome::LoadFailed(e),
            },
            SessionCommand::SetVolume { track, volume } => {
                CommandOutcome::from_flag(self.set_volume(track, volume))
            }
            SessionCommand::SetMuted { track, muted } => {
                CommandOutcome::from_flag(self.set_muted(track, muted))
            }
            SessionCommand::SetSolo { track, solo } => {
                CommandOutcome::from_flag(self.set_solo(track, solo))
            }
            SessionCommand::SetLooping { track, looping } => {
                CommandOutcome::from_flag(self.set_looping(track, looping))
            }
            SessionCommand::SetLoopRegion { track, start, end } => {
                CommandOutcome::from_flag(self.set_loop_region(track, start, end))
            }
            SessionCommand::ClearLoopRegion { track } => {
                CommandOutcome::from_flag(self.clear_loop_region(track))
            }
            SessionCommand::SetStretchRatio { track, ratio } => {
                CommandOutcome::from_flag(self.set_stretch_ratio(track, ratio))
            }
            SessionCommand::SetManualBpm { track, bpm } => {
                CommandOutcome::from_flag(self.set_manual_bpm(track, bpm))
            }
            SessionCommand::SetPosition { track, seconds } => {
                CommandOutcome::from_flag(self.set_position(track, seconds))
            }
            SessionCommand::Play => CommandOutcome::Transport {
                playing: self.play(),
            },
            SessionCommand::Stop => {
                self.stop();
                CommandOutcome::Transport { playing: false }
            }
            SessionCommand::Record => CommandOutcome::Recording(self.record()),
            SessionCommand::SetTempo(bpm) => {
                if self.set_tempo(bpm) {
                    CommandOutcome::Tempo(bpm)
                } else {
                    CommandOutcome::Rejected
                }
            }
            SessionCommand::AutoSync => match self.auto_sync_tracks() {
                Some(bpm) => CommandOutcome::Tempo(bpm),
                None => CommandOutcome::Rejected,
            },
            SessionCommand::ToggleMetronome => CommandOutcome::Metronome(self.toggle_metronome()),
        }
    }
}
