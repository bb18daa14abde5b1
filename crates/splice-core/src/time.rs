//! Frame-based time for the timeline.
//!
//! Every position, in/out point and duration in the model is an integer
//! frame count. [`FrameRate`] only matters at the edges, when a frame count
//! has to be shown to a person or compared against wall-clock seconds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame rate as a rational number (e.g., 24000/1001 for 23.976 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 24000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// A rate with a zero term cannot convert anything.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.numerator != 0 && self.denominator != 0
    }

    /// Seconds covered by `frames` frames.
    pub fn frames_to_seconds(self, frames: i64) -> f64 {
        frames as f64 * self.denominator as f64 / self.numerator as f64
    }

    /// PAL, the default rate.
    pub const FPS_25: Self = Self::new(25, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_25
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// A half-open frame range `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    /// First frame (inclusive)
    pub start: i64,
    /// Number of frames
    pub duration: i64,
}

impl FrameRange {
    #[inline]
    pub const fn new(start: i64, duration: i64) -> Self {
        Self { start, duration }
    }

    /// End frame (exclusive). Saturates instead of wrapping; stored
    /// ranges are checked on placement so they never reach the limit.
    #[inline]
    pub fn end(self) -> i64 {
        self.start.saturating_add(self.duration)
    }

    #[inline]
    pub fn contains(self, frame: i64) -> bool {
        frame >= self.start && frame < self.end()
    }

    /// Check if two ranges share at least one frame.
    #[inline]
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

impl fmt::Display for FrameRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}
