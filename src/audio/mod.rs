// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio plumbing for the looper.
//!
//! This module provides:
//! - Planar sample buffers shared by every layer
//! - File decoding and sample rate conversion for clip loading
//! - Audio output via cpal, driving [`Session::mix_block`]

pub mod buffer;
pub mod decoder;
pub mod output;
pub mod resample;

pub use buffer::AudioBuffer;
pub use decoder::{AudioDecoder, DecodeError, DecodedAudio, WavDecoder};
pub use output::{AudioConfig, AudioOutput};
pub use resample::resample;

use std::sync::Arc;

use thiserror::Error;

use crate::session::Session;

/// Audio engine: connects a [`Session`] to the output device
pub struct AudioEngine {
    /// Session mixed by the device callback
    session: Arc<Session>,
    /// Audio output
    output: Option<AudioOutput>,
    /// Device configuration
    config: AudioConfig,
}

impl AudioEngine {
    /// Create an engine for `session` using the session's sample rate
    pub fn new(session: Arc<Session>) -> Self {
        let config = AudioConfig {
            sample_rate: session.sample_rate(),
            ..AudioConfig::default()
        };
        Self {
            session,
            output: None,
            config,
        }
    }

    /// Create with an explicit device configuration
    pub fn with_config(session: Arc<Session>, config: AudioConfig) -> Self {
        Self {
            session,
            output: None,
            config,
        }
    }

    /// Session driven by this engine
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Start audio output
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.output.is_some() {
            return Ok(());
        }
        if self.config.sample_rate != self.session.sample_rate() {
            return Err(AudioError::InvalidConfig(format!(
                "device rate {} Hz differs from session rate {} Hz",
                self.config.sample_rate,
                self.session.sample_rate()
            )));
        }

        let session = Arc::clone(&self.session);
        let block_frames = self.config.buffer_size.max(64) as usize;
        let mut block = AudioBuffer::new(self.config.channels as usize, block_frames);

        let output = AudioOutput::new(self.config.clone(), move |data, channels| {
            let total = data.len() / channels;
            let mut done = 0;
            while done < total {
                let frames = (total - done).min(block_frames);
                session.mix_block(&mut block, frames);
                let out = &mut data[done * channels..(done + frames) * channels];
                block.write_interleaved(out, channels, frames);
                done += frames;
            }
        })?;

        self.output = Some(output);
        Ok(())
    }

    /// Stop audio output
    pub fn stop(&mut self) {
        if self.output.take().is_some() {
            tracing::info!("audio output stopped");
        }
    }

    /// Check if running
    pub fn is_running(&self) -> bool {
        self.output.is_some()
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Set buffer size (requires restart)
    pub fn set_buffer_size(&mut self, size: u32) {
        self.config.buffer_size = size.clamp(64, 4096);
    }

    /// Current device configuration
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Audio device errors
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// Failed to initialize audio
    #[error("audio initialization failed: {0}")]
    InitFailed(String),
    /// Failed to start audio stream
    #[error("audio stream failed: {0}")]
    StreamFailed(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
    /// Invalid configuration
    #[error("invalid audio configuration: {0}")]
    InvalidConfig(String),
}
