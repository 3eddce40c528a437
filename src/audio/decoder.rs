// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio file decoding.
//!
//! The engine never reads files itself; it asks an [`AudioDecoder`] for a
//! decoded buffer on the control thread. [`WavDecoder`] is the built-in
//! implementation.

use std::path::{Path, PathBuf};

use thiserror::Error;

use super::buffer::AudioBuffer;

/// Result of decoding one file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Planar samples in [-1, 1]
    pub buffer: AudioBuffer,
    /// Native sample rate of the file
    pub sample_rate: u32,
    /// Display name (file stem)
    pub name: String,
}

/// Decoding failures
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File could not be opened or read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// File is not in a format this decoder understands
    #[error("unsupported audio format in {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },
    /// File decoded but contains no frames
    #[error("{0} contains no audio")]
    Empty(PathBuf),
}

/// Capability to turn a file into decoded samples
pub trait AudioDecoder: Send + Sync {
    /// Decode the file at `path`
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError>;
}

/// WAV decoder backed by `hound`
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl WavDecoder {
    /// Create a new WAV decoder
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for WavDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio, DecodeError> {
        let reader = hound::WavReader::open(path).map_err(|e| hound_error(path, e))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(DecodeError::Unsupported {
                path: path.to_path_buf(),
                reason: "zero channels".to_string(),
            });
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| hound_error(path, e))?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| hound_error(path, e))?
            }
        };

        let buffer = AudioBuffer::from_interleaved(&samples, channels);
        if buffer.is_empty() {
            return Err(DecodeError::Empty(path.to_path_buf()));
        }

        Ok(DecodedAudio {
            buffer,
            sample_rate: spec.sample_rate,
            name: display_name(path),
        })
    }
}

/// File stem used as the track name
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn hound_error(path: &Path, error: hound::Error) -> DecodeError {
    match error {
        hound::Error::IoError(source) => DecodeError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => DecodeError::Unsupported {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, spec: hound::WavSpec, frames: &[i16]) {
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_int_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beat.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_wav(&path, spec, &[16384, -16384, 0, 8192]);

        let decoded = WavDecoder::new().decode(&path).unwrap();
        assert_eq!(decoded.sample_rate, 48000);
        assert_eq!(decoded.name, "beat");
        assert_eq!(decoded.buffer.num_channels(), 2);
        assert_eq!(decoded.buffer.num_frames(), 2);
        assert!((decoded.buffer.channel(0)[0] - 0.5).abs() < 1e-4);
        assert!((decoded.buffer.channel(1)[0] + 0.5).abs() < 1e-4);
        assert!((decoded.buffer.channel(1)[1] - 0.25).abs() < 1e-4);
    }

    #[test]
    fn test_decode_float_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pad.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.1f32, -0.2, 0.3] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = WavDecoder::new().decode(&path).unwrap();
        assert_eq!(decoded.buffer.num_channels(), 1);
        assert_eq!(decoded.buffer.channel(0), &[0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_decode_missing_file() {
        let result = WavDecoder::new().decode(Path::new("/nonexistent/loop.wav"));
        assert!(matches!(result, Err(DecodeError::Io { .. })));
    }

    #[test]
    fn test_decode_garbage_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();
        let result = WavDecoder::new().decode(&path);
        assert!(matches!(result, Err(DecodeError::Unsupported { .. })));
    }

    #[test]
    fn test_decode_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_wav(&path, spec, &[]);
        let result = WavDecoder::new().decode(&path);
        assert!(matches!(result, Err(DecodeError::Empty(_))));
    }
}
