// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Offline sample rate conversion for freshly decoded clips.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::buffer::AudioBuffer;

/// Input chunk size fed to the sinc resampler
const CHUNK_SIZE: usize = 1024;

/// Convert `input` from `from_rate` to `to_rate`.
///
/// Returns a copy when the rates already match. Runs on the control thread
/// only; it allocates freely.
pub fn resample(input: &AudioBuffer, from_rate: u32, to_rate: u32) -> anyhow::Result<AudioBuffer> {
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.clone());
    }
    if from_rate == 0 || to_rate == 0 {
        anyhow::bail!("invalid sample rate conversion {} -> {}", from_rate, to_rate);
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let channels = input.num_channels();
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, channels)?;

    let input_len = input.num_frames();
    let expected_len = (input_len as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected_len + CHUNK_SIZE); channels];

    let mut chunk: Vec<Vec<f32>> = vec![vec![0.0; CHUNK_SIZE]; channels];
    let mut pos = 0;
    while pos < input_len {
        let end = (pos + CHUNK_SIZE).min(input_len);
        for (ch, dest) in chunk.iter_mut().enumerate() {
            let src = &input.channel(ch)[pos..end];
            dest[..src.len()].copy_from_slice(src);
            dest[src.len()..].fill(0.0);
        }
        let processed = resampler.process(&chunk, None)?;
        for (dest, produced) in output.iter_mut().zip(processed) {
            dest.extend_from_slice(&produced);
        }
        pos += CHUNK_SIZE;
    }

    for channel in &mut output {
        channel.resize(expected_len, 0.0);
    }
    Ok(AudioBuffer::from_channels(output))
}
