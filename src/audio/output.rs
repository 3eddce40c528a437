// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Audio output via cpal.
//!
//! Opens the default output device and drives a user callback with the
//! device's interleaved `f32` buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use serde::{Deserialize, Serialize};

use super::AudioError;

/// Audio output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Buffer size in frames
    pub buffer_size: u32,
    /// Number of output channels
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
        }
    }
}

impl AudioConfig {
    /// Buffer latency in milliseconds
    pub fn latency_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        (self.buffer_size as f64 / self.sample_rate as f64) * 1000.0
    }
}

/// Audio output stream
pub struct AudioOutput {
    /// cpal stream, stopped on drop
    _stream: Stream,
    /// Output device
    device: Device,
    /// Current configuration
    config: AudioConfig,
}

impl AudioOutput {
    /// Open the default device and start calling `callback`.
    ///
    /// The callback receives a zeroed interleaved buffer and the channel count.
    pub fn new<F>(config: AudioConfig, mut callback: F) -> Result<Self, AudioError>
    where
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        if config.channels == 0 || config.sample_rate == 0 {
            return Err(AudioError::InvalidConfig(format!(
                "{} channels at {} Hz",
                config.channels, config.sample_rate
            )));
        }

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        device
            .default_output_config()
            .map_err(|e| AudioError::InitFailed(format!("failed to get default config: {}", e)))?;

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    callback(data, channels);
                },
                move |err| {
                    tracing::error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamFailed(format!("failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamFailed(format!("failed to start stream: {}", e)))?;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "audio output started"
        );

        Ok(Self {
            _stream: stream,
            device,
            config,
        })
    }

    /// Get current configuration
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Name of the device being played through
    pub fn device_name(&self) -> Option<String> {
        self.device.name().ok()
    }

    /// Calculate latency in milliseconds
    pub fn latency_ms(&self) -> f64 {
        self.config.latency_ms()
    }
}

/// List available audio output devices
pub fn list_devices() -> Vec<String> {
    let host = cpal::default_host();
    host.output_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

/// Get default device name
pub fn default_device_name() -> Option<String> {
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// Get supported sample rates for default device
pub fn supported_sample_rates() -> Vec<u32> {
    let host = cpal::default_host();
    if let Some(device) = host.default_output_device() {
        if let Ok(configs) = device.supported_output_configs() {
            let mut rates: Vec<u32> = configs
                .flat_map(|c| {
                    let min = c.min_sample_rate().0;
                    let max = c.max_sample_rate().0;
                    [44100, 48000, 88200, 96000, 176400, 192000]
                        .into_iter()
                        .filter(move |&r| r >= min && r <= max)
                })
                .collect();
            rates.sort_unstable();
            rates.dedup();
            if !rates.is_empty() {
                return rates;
            }
        }
    }
    vec![44100, 48000]
}
