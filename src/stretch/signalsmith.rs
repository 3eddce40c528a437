// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Adapter exposing `signalsmith-stretch` through the [`Stretcher`] trait.
//!
//! The library works on interleaved blocks and derives the stretch from the
//! ratio between the input and output block lengths. Input is queued on
//! [`put`](Stretcher::put) and converted on [`retrieve`](Stretcher::retrieve),
//! where the block lengths are sized from the current time ratio.
//!
//! Both queues are reserved on configure for the largest block at the
//! smallest ratio, so steady-state playback does not reallocate.

use signalsmith_stretch::Stretch;

use super::{clamp_ratio, Stretcher, MAX_BLOCK_FRAMES, MIN_STRETCH_RATIO};
use crate::audio::AudioBuffer;

/// Input frames a single block can demand at the smallest ratio
const MAX_BLOCK_INPUT: usize = (MAX_BLOCK_FRAMES as f64 / MIN_STRETCH_RATIO) as usize + 1;

/// `signalsmith-stretch` backend
pub struct SignalsmithStretcher {
    stretch: Stretch,
    channels: usize,
    ratio: f64,
    /// Queued interleaved input
    pending: Vec<f32>,
    /// Interleaved output scratch
    scratch: Vec<f32>,
}

impl SignalsmithStretcher {
    /// Create a stereo 44.1 kHz stretcher at unity ratio
    pub fn new() -> Self {
        Self::with_config(2, 44100, 1.0)
    }

    /// Create a stretcher for the given layout
    pub fn with_config(channels: usize, sample_rate: u32, ratio: f64) -> Self {
        let channels = channels.max(1);
        let stretch = Stretch::preset_default(channels as u32, sample_rate);
        // Leftover from the previous block plus a full block with latency padding
        let latency = stretch.input_latency() + stretch.output_latency();
        let pending_frames = 2 * MAX_BLOCK_INPUT + latency;
        Self {
            stretch,
            channels,
            ratio: clamp_ratio(ratio),
            pending: Vec::with_capacity(pending_frames * channels),
            scratch: Vec::with_capacity(MAX_BLOCK_FRAMES * channels),
        }
    }

    fn pending_frames(&self) -> usize {
        self.pending.len() / self.channels
    }
}

impl Default for SignalsmithStretcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Stretcher for SignalsmithStretcher {
    fn configure(&mut self, channels: usize, sample_rate: u32, ratio: f64) {
        *self = Self::with_config(channels, sample_rate, ratio);
    }

    fn set_ratio(&mut self, ratio: f64) {
        self.ratio = clamp_ratio(ratio);
    }

    fn ratio(&self) -> f64 {
        self.ratio
    }

    fn put(&mut self, input: &AudioBuffer, start: usize, count: usize) {
        let in_channels = input.num_channels();
        if in_channels == 0 {
            return;
        }
        let end = (start + count).min(input.num_frames());
        for i in start..end {
            for ch in 0..self.channels {
                self.pending.push(input.channel(ch.min(in_channels - 1))[i]);
            }
        }
    }

    fn retrieve(&mut self, output: &mut AudioBuffer, max_count: usize) -> usize {
        let out_frames = self.available().min(max_count).min(output.num_frames());
        if out_frames == 0 {
            return 0;
        }
        let in_frames = ((out_frames as f64 / self.ratio).round() as usize)
            .clamp(1, self.pending_frames());

        let ch = self.channels;
        self.scratch.clear();
        self.scratch.resize(out_frames * ch, 0.0);
        self.stretch
            .process(&self.pending[..in_frames * ch], &mut self.scratch[..]);
        self.pending.drain(..in_frames * ch);

        for (i, frame) in self.scratch.chunks_exact(ch).enumerate() {
            for (c, &sample) in frame.iter().enumerate().take(output.num_channels()) {
                output.channel_mut(c)[i] = sample;
            }
        }
        out_frames
    }

    fn available(&self) -> usize {
        (self.pending_frames() as f64 * self.ratio) as usize
    }

    fn latency(&self) -> usize {
        self.stretch.input_latency() + self.stretch.output_latency()
    }

    fn clear(&mut self) {
        self.stretch.reset();
        self.pending.clear();
        self.scratch.clear();
    }
}
