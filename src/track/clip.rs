// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Clip preparation.
//!
//! Decoding, resampling, peak extraction and tempo analysis all happen here,
//! on the control thread, before a track lock is taken. Installing the result
//! into a [`Track`](super::Track) is then a cheap swap.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::analysis::{peak_envelope, BpmEstimate, BpmEstimator};
use crate::audio::{resample, AudioBuffer, AudioDecoder, DecodeError, DecodedAudio};
use crate::stretch::{default_stretcher, Stretcher};

use super::MAX_BLOCK_FRAMES;

/// Load failures. The target track is left untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Sample rate conversion failed
    #[error("failed to resample {name} from {from} Hz to {to} Hz: {reason}")]
    Resample {
        name: String,
        from: u32,
        to: u32,
        reason: String,
    },
    /// Track index out of range
    #[error("track {index} does not exist (capacity {capacity})")]
    InvalidSlot { index: usize, capacity: usize },
}

/// A clip ready to be installed into a track.
///
/// Also carries a stretcher and render scratch sized for the clip, so
/// installing it allocates nothing.
pub struct PreparedClip {
    /// Samples at the session rate
    pub buffer: AudioBuffer,
    /// Rate of `buffer`
    pub sample_rate: u32,
    /// Display name
    pub name: String,
    /// Source file, if any
    pub path: Option<PathBuf>,
    /// Peak envelope for waveform display
    pub peaks: Vec<f32>,
    /// Tempo estimate
    pub bpm: BpmEstimate,
    pub(super) stretcher: Box<dyn Stretcher>,
    pub(super) scratch: AudioBuffer,
}

impl PreparedClip {
    /// Decode `path` and prepare it for playback at `target_rate`
    pub fn from_file(
        decoder: &dyn AudioDecoder,
        path: &Path,
        target_rate: u32,
    ) -> Result<Self, LoadError> {
        let decoded = decoder.decode(path)?;
        let mut clip = Self::from_decoded(decoded, target_rate)?;
        clip.path = Some(path.to_path_buf());
        Ok(clip)
    }

    /// Prepare already-decoded audio for playback at `target_rate`
    pub fn from_decoded(decoded: DecodedAudio, target_rate: u32) -> Result<Self, LoadError> {
        let DecodedAudio {
            buffer,
            sample_rate,
            name,
        } = decoded;

        let buffer = if sample_rate != target_rate {
            tracing::debug!(%name, from = sample_rate, to = target_rate, "resampling clip");
            resample(&buffer, sample_rate, target_rate).map_err(|e| LoadError::Resample {
                name: name.clone(),
                from: sample_rate,
                to: target_rate,
                reason: e.to_string(),
            })?
        } else {
            buffer
        };

        Ok(Self::analyze(buffer, target_rate, name))
    }

    /// Analyze a buffer already at its playback rate
    pub fn analyze(buffer: AudioBuffer, sample_rate: u32, name: impl Into<String>) -> Self {
        let peaks = peak_envelope(&buffer, sample_rate);
        let bpm = BpmEstimator::default().estimate(&buffer, sample_rate);
        let channels = buffer.num_channels();
        let mut stretcher = default_stretcher();
        stretcher.configure(channels, sample_rate, 1.0);
        Self {
            buffer,
            sample_rate,
            name: name.into(),
            path: None,
            peaks,
            bpm,
            stretcher,
            scratch: AudioBuffer::new(channels, MAX_BLOCK_FRAMES),
        }
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer.num_frames() as f64 / self.sample_rate as f64
    }
}
