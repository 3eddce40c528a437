// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Capture of the track mix into a pre-allocated take buffer.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::AudioBuffer;

/// Default take capacity in seconds
pub const DEFAULT_MAX_RECORD_SECONDS: f64 = 300.0;

/// Take export failures
#[derive(Debug, Error)]
pub enum RecordError {
    /// The WAV file could not be written
    #[error("failed to write take to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    /// Nothing was captured
    #[error("take is empty")]
    Empty,
}

/// A finished recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTake {
    /// Captured audio
    pub buffer: AudioBuffer,
    /// Rate of `buffer`
    pub sample_rate: u32,
    /// True when capture stopped because the buffer filled up
    pub truncated: bool,
}

impl RecordedTake {
    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.buffer.num_frames() as f64 / self.sample_rate as f64
    }

    /// Export as 32-bit float WAV
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), RecordError> {
        let path = path.as_ref();
        if self.buffer.is_empty() {
            return Err(RecordError::Empty);
        }
        let wrap = |source| RecordError::Write {
            path: path.to_path_buf(),
            source,
        };

        let spec = hound::WavSpec {
            channels: self.buffer.num_channels() as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).map_err(wrap)?;
        for i in 0..self.buffer.num_frames() {
            for channel in self.buffer.channels() {
                writer.write_sample(channel[i]).map_err(wrap)?;
            }
        }
        writer.finalize().map_err(wrap)?;

        tracing::info!(path = %path.display(), seconds = self.duration(), "take written");
        Ok(())
    }
}

/// Take buffer being filled by the audio thread
#[derive(Debug)]
pub struct Recorder {
    buffer: AudioBuffer,
    sample_rate: u32,
    written: usize,
}

impl Recorder {
    /// Allocate room for `max_seconds` of audio. Control thread only.
    pub fn new(channels: usize, sample_rate: u32, max_seconds: f64) -> Self {
        let frames = (max_seconds.max(0.0) * sample_rate as f64) as usize;
        Self {
            buffer: AudioBuffer::new(channels, frames),
            sample_rate,
            written: 0,
        }
    }

    /// Frames captured so far
    pub fn frames_written(&self) -> usize {
        self.written
    }

    /// Total capacity in frames
    pub fn capacity(&self) -> usize {
        self.buffer.num_frames()
    }

    /// True once the buffer is full
    pub fn is_full(&self) -> bool {
        self.written >= self.capacity()
    }

    /// Append the first `frame_count` frames of `block`. Never allocates;
    /// audio beyond capacity is dropped.
    pub fn capture(&mut self, block: &AudioBuffer, frame_count: usize) {
        let count = frame_count
            .min(block.num_frames())
            .min(self.capacity() - self.written);
        if count == 0 {
            return;
        }
        self.buffer.mix_from(block, 0, self.written, count, 1.0);
        self.written += count;
    }

    /// Trim to what was captured
    pub fn finish(mut self) -> RecordedTake {
        let truncated = self.is_full();
        let channels = self.buffer.num_channels();
        self.buffer.resize(channels, self.written);
        RecordedTake {
            buffer: self.buffer,
            sample_rate: self.sample_rate,
            truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_finish() {
        let mut recorder = Recorder::new(2, 100, 1.0);
        assert_eq!(recorder.capacity(), 100);
        let block = AudioBuffer::from_channels(vec![vec![0.5; 30], vec![-0.5; 30]]);
        recorder.capture(&block, 30);
        recorder.capture(&block, 10);
        assert_eq!(recorder.frames_written(), 40);

        let take = recorder.finish();
        assert_eq!(take.buffer.num_frames(), 40);
        assert_eq!(take.buffer.channel(1)[39], -0.5);
        assert!(!take.truncated);
        assert!((take.duration() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_capture_stops_at_capacity() {
        let mut recorder = Recorder::new(1, 10, 1.0);
        let block = AudioBuffer::from_channels(vec![vec![1.0; 8]]);
        recorder.capture(&block, 8);
        recorder.capture(&block, 8);
        assert!(recorder.is_full());
        let take = recorder.finish();
        assert_eq!(take.buffer.num_frames(), 10);
        assert!(take.truncated);
    }

    #[test]
    fn test_mono_block_fills_both_channels() {
        let mut recorder = Recorder::new(2, 100, 1.0);
        recorder.capture(&AudioBuffer::from_channels(vec![vec![0.25; 4]]), 4);
        let take = recorder.finish();
        assert_eq!(take.buffer.channel(1), &[0.25; 4]);
    }

    #[test]
    fn test_write_wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let mut recorder = Recorder::new(2, 48000, 1.0);
        let block = AudioBuffer::from_channels(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        recorder.capture(&block, 2);
        recorder.finish().write_wav(&path).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 48000);
        let samples: Vec<f32> = reader.into_samples::<f32>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0.1, 0.3, 0.2, 0.4]);
    }

    #[test]
    fn test_empty_take_is_rejected() {
        let take = Recorder::new(2, 48000, 1.0).finish();
        let dir = tempfile::tempdir().unwrap();
        let result = take.write_wav(dir.path().join("nothing.wav"));
        assert!(matches!(result, Err(RecordError::Empty)));
    }
}
