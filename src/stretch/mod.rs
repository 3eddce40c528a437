// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pitch-preserving time stretching.
//!
//! Tracks talk to a [`Stretcher`] only through this trait, so playback logic
//! never depends on the backend. [`SignalsmithStretcher`] adapts the
//! `signalsmith-stretch` library.
//!
//! The ratio handed to a stretcher is a *time ratio*: output frames produced
//! per input frame consumed. A ratio below 1.0 shortens the audio (plays it
//! faster), above 1.0 lengthens it.

pub mod signalsmith;

pub use signalsmith::SignalsmithStretcher;

use crate::audio::AudioBuffer;

/// Smallest stretch ratio the engine allows
pub const MIN_STRETCH_RATIO: f64 = 0.25;

/// Largest stretch ratio the engine allows
pub const MAX_STRETCH_RATIO: f64 = 4.0;

/// Largest block a stretcher is asked to produce in one retrieve
pub const MAX_BLOCK_FRAMES: usize = 4096;

/// Clamp a ratio into the supported range.
///
/// Non-finite values fall back to 1.0.
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(MIN_STRETCH_RATIO, MAX_STRETCH_RATIO)
    } else {
        1.0
    }
}

/// Streaming time-stretch primitive.
///
/// Input is pushed with [`put`](Stretcher::put) and output pulled with
/// [`retrieve`](Stretcher::retrieve). Implementations may hold input back
/// internally; [`latency`](Stretcher::latency) reports roughly how many input
/// frames are needed before output appears.
pub trait Stretcher: Send {
    /// (Re)initialize for a channel count, sample rate and time ratio.
    ///
    /// Discards all internal state. May allocate; call from the control thread.
    fn configure(&mut self, channels: usize, sample_rate: u32, ratio: f64);

    /// Change the time ratio without discarding buffered audio
    fn set_ratio(&mut self, ratio: f64);

    /// Current time ratio
    fn ratio(&self) -> f64;

    /// Push `count` frames of `input` starting at frame `start`
    fn put(&mut self, input: &AudioBuffer, start: usize, count: usize);

    /// Pull up to `max_count` frames into the start of `output`.
    ///
    /// Returns the number of frames written.
    fn retrieve(&mut self, output: &mut AudioBuffer, max_count: usize) -> usize;

    /// Frames ready to be retrieved right now
    fn available(&self) -> usize;

    /// Input frames consumed before the first output frame is produced
    fn latency(&self) -> usize;

    /// Drop all buffered input and output
    fn clear(&mut self);
}

/// Build the default stretcher backend
pub fn default_stretcher() -> Box<dyn Stretcher> {
    Box::new(SignalsmithStretcher::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_ratio() {
        assert_eq!(clamp_ratio(0.1), MIN_STRETCH_RATIO);
        assert_eq!(clamp_ratio(10.0), MAX_STRETCH_RATIO);
        assert_eq!(clamp_ratio(1.5), 1.5);
        assert_eq!(clamp_ratio(f64::NAN), 1.0);
        assert_eq!(clamp_ratio(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_default_stretcher_starts_unity() {
        let stretcher = default_stretcher();
        assert_eq!(stretcher.ratio(), 1.0);
        assert_eq!(stretcher.available(), 0);
    }
}
