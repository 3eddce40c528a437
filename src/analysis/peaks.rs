// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Downsampled peak envelopes.

use crate::audio::AudioBuffer;

/// Envelope resolution
pub const PEAKS_PER_SECOND: u32 = 100;

/// One peak per 1/100 s slice: the largest absolute sample across all
/// channels, clamped to [0, 1]. A trailing partial slice gets its own peak.
pub fn peak_envelope(buffer: &AudioBuffer, sample_rate: u32) -> Vec<f32> {
    let frames = buffer.num_frames();
    if frames == 0 {
        return Vec::new();
    }
    let slice = ((sample_rate / PEAKS_PER_SECOND) as usize).max(1);

    (0..frames)
        .step_by(slice)
        .map(|start| {
            let end = (start + slice).min(frames);
            buffer
                .channels()
                .flat_map(|c| c[start..end].iter())
                .fold(0.0f32, |acc, s| acc.max(s.abs()))
                .min(1.0)
        })
        .collect()
}
