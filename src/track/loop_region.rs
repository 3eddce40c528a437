// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Loop regions.

use serde::{Deserialize, Serialize};

/// A `[start, end)` range of a clip in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    /// Region start in seconds
    pub start: f64,
    /// Region end in seconds
    pub end: f64,
}

impl LoopRegion {
    /// Build a region if `0 <= start < end <= duration`
    pub fn new(start: f64, end: f64, duration: f64) -> Option<Self> {
        if start.is_finite() && end.is_finite() && 0.0 <= start && start < end && end <= duration {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Region length in seconds
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// True if `seconds` lies inside the region
    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start && seconds < self.end
    }

    /// Frame bounds `[start, end)` at `sample_rate`, clamped to `total_frames`
    pub fn frame_bounds(&self, sample_rate: u32, total_frames: usize) -> (usize, usize) {
        let to_frame = |s: f64| ((s * sample_rate as f64).round().max(0.0) as usize).min(total_frames);
        (to_frame(self.start), to_frame(self.end))
    }
}
