// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Offline analysis of decoded clips.
//!
//! This module provides:
//! - Tempo estimation with a layered fallback pipeline
//! - Peak envelopes for waveform display
//!
//! Everything here is pure and runs on the control thread while a clip is
//! being prepared, never under a lock the audio thread can take.

pub mod bpm;
pub mod peaks;

pub use bpm::{estimate_bpm, BpmEstimate, BpmEstimator, BpmSource, MAX_BPM, MIN_BPM};
pub use peaks::{peak_envelope, PEAKS_PER_SECOND};
