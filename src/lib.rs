// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Multitrack tempo-synchronized audio looper.
//!
//! Clips are decoded into track slots, analyzed for tempo, and time-stretched
//! so every loop follows a single master tempo. The device callback calls
//! [`Session::mix_block`]; everything else happens on control threads.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod session;
pub mod stretch;
pub mod track;

pub use analysis::{BpmEstimate, BpmSource};
pub use audio::{AudioBuffer, AudioConfig, AudioEngine, AudioError};
pub use config::LooperConfig;
pub use session::{CommandOutcome, LoadOutcome, Session, SessionCommand, SessionConfig};
pub use track::{LoadError, PreparedClip, Track, TrackSnapshot};
