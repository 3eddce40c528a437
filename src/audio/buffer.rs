// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Planar multi-channel sample buffer.
//!
//! Every layer of the engine works on planar data (one `Vec<f32>` per
//! channel). Conversion to and from the interleaved layout used by audio
//! devices and WAV files happens only at the edges.

/// A planar buffer of `f32` samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioBuffer {
    /// One vector per channel, all the same length
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_channels: usize, num_frames: usize) -> Self {
        Self {
            channels: vec![vec![0.0; num_frames]; num_channels],
        }
    }

    /// Build a buffer from per-channel vectors.
    ///
    /// Channels shorter than the longest one are padded with silence.
    pub fn from_channels(mut channels: Vec<Vec<f32>>) -> Self {
        let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
        for channel in &mut channels {
            channel.resize(frames, 0.0);
        }
        Self { channels }
    }

    /// Build a buffer from interleaved samples.
    ///
    /// A trailing partial frame is discarded.
    pub fn from_interleaved(samples: &[f32], num_channels: usize) -> Self {
        if num_channels == 0 {
            return Self::default();
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self { channels }
    }

    /// Number of channels
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// True when the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    /// Read access to one channel
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Write access to one channel
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Iterate over channels
    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Zero every sample
    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    /// Zero `count` frames starting at `start` (clamped to the buffer)
    pub fn clear_range(&mut self, start: usize, count: usize) {
        for channel in &mut self.channels {
            let end = (start + count).min(channel.len());
            if start < end {
                channel[start..end].fill(0.0);
            }
        }
    }

    /// Change the channel count and frame count, zeroing new space.
    ///
    /// Does not reallocate when shrinking or when capacity already suffices.
    pub fn resize(&mut self, num_channels: usize, num_frames: usize) {
        self.channels.resize_with(num_channels, Vec::new);
        for channel in &mut self.channels {
            channel.resize(num_frames, 0.0);
        }
    }

    /// Additively mix `count` frames of `source` (from `source_start`) into
    /// this buffer at `dest_start`, scaled by `gain`.
    ///
    /// Channels are matched up to `min(self, source)`. A mono source feeding a
    /// buffer with two or more channels is duplicated into the second channel.
    pub fn mix_from(
        &mut self,
        source: &AudioBuffer,
        source_start: usize,
        dest_start: usize,
        count: usize,
        gain: f32,
    ) {
        let count = count
            .min(source.num_frames().saturating_sub(source_start))
            .min(self.num_frames().saturating_sub(dest_start));
        if count == 0 {
            return;
        }

        let shared = self.num_channels().min(source.num_channels());
        for ch in 0..shared {
            let src = &source.channels[ch][source_start..source_start + count];
            let dst = &mut self.channels[ch][dest_start..dest_start + count];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s * gain;
            }
        }

        if source.num_channels() == 1 && self.num_channels() >= 2 {
            let src = &source.channels[0][source_start..source_start + count];
            let dst = &mut self.channels[1][dest_start..dest_start + count];
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s * gain;
            }
        }
    }

    /// Write the first `frames` frames into an interleaved slice with
    /// `out_channels` channels.
    ///
    /// Missing channels are written as silence; extra buffer channels are
    /// ignored.
    pub fn write_interleaved(&self, out: &mut [f32], out_channels: usize, frames: usize) {
        if out_channels == 0 {
            return;
        }
        let frames = frames.min(self.num_frames()).min(out.len() / out_channels);
        for (i, frame) in out.chunks_exact_mut(out_channels).take(frames).enumerate() {
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = self.channels.get(ch).map_or(0.0, |c| c[i]);
            }
        }
    }

    /// Average all channels into one mono vector
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.num_channels();
        if channels == 0 {
            return Vec::new();
        }
        let scale = 1.0 / channels as f32;
        (0..self.num_frames())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_silent() {
        let buffer = AudioBuffer::new(2, 16);
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.num_frames(), 16);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_from_interleaved() {
        let buffer = AudioBuffer::from_interleaved(&[1.0, -1.0, 0.5, -0.5, 0.25], 2);
        assert_eq!(buffer.num_frames(), 2);
        assert_eq!(buffer.channel(0), &[1.0, 0.5]);
        assert_eq!(buffer.channel(1), &[-1.0, -0.5]);
    }

    #[test]
    fn test_from_channels_pads_short_channels() {
        let buffer = AudioBuffer::from_channels(vec![vec![1.0, 1.0, 1.0], vec![2.0]]);
        assert_eq!(buffer.num_frames(), 3);
        assert_eq!(buffer.channel(1), &[2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mix_from_applies_gain_and_offsets() {
        let source = AudioBuffer::from_channels(vec![vec![1.0; 4], vec![2.0; 4]]);
        let mut dest = AudioBuffer::new(2, 4);
        dest.mix_from(&source, 1, 2, 10, 0.5);
        assert_eq!(dest.channel(0), &[0.0, 0.0, 0.5, 0.5]);
        assert_eq!(dest.channel(1), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_mix_from_duplicates_mono() {
        let source = AudioBuffer::from_channels(vec![vec![0.5; 3]]);
        let mut dest = AudioBuffer::new(2, 3);
        dest.mix_from(&source, 0, 0, 3, 1.0);
        assert_eq!(dest.channel(0), &[0.5; 3]);
        assert_eq!(dest.channel(1), &[0.5; 3]);
    }

    #[test]
    fn test_mix_from_clamps_channels() {
        let source = AudioBuffer::from_channels(vec![vec![1.0; 2], vec![1.0; 2], vec![1.0; 2]]);
        let mut dest = AudioBuffer::new(2, 2);
        dest.mix_from(&source, 0, 0, 2, 1.0);
        assert_eq!(dest.channel(0), &[1.0, 1.0]);
        assert_eq!(dest.channel(1), &[1.0, 1.0]);
    }

    #[test]
    fn test_write_interleaved() {
        let buffer = AudioBuffer::from_channels(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let mut out = [9.0f32; 6];
        buffer.write_interleaved(&mut out, 3, 2);
        assert_eq!(out, [1.0, 3.0, 0.0, 2.0, 4.0, 0.0]);
    }

    #[test]
    fn test_to_mono() {
        let buffer = AudioBuffer::from_channels(vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(buffer.to_mono(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_clear_range() {
        let mut buffer = AudioBuffer::from_channels(vec![vec![1.0; 4]]);
        buffer.clear_range(1, 2);
        assert_eq!(buffer.channel(0), &[1.0, 0.0, 0.0, 1.0]);
        buffer.clear_range(3, 100);
        assert_eq!(buffer.channel(0), &[1.0, 0.0, 0.0, 0.0]);
    }
}
