//! Timeline configuration.

use serde::{Deserialize, Serialize};
use splice_core::{FrameRate, Result, TimelineError};

/// Tunables of one timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Frame rate used to convert frames to seconds for display
    pub frame_rate: FrameRate,
    /// Maximum distance in frames a snapping edit may jump
    pub snap_distance: i64,
    /// Height given to new tracks, in pixels
    pub default_track_height: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            frame_rate: FrameRate::FPS_25,
            snap_distance: 10,
            default_track_height: 60,
        }
    }
}

impl TimelineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| TimelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| TimelineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.frame_rate.is_valid() {
            return Err(TimelineError::Config(format!(
                "invalid frame rate {}/{}",
                self.frame_rate.numerator, self.frame_rate.denominator
            )));
        }
        if self.snap_distance < 0 {
            return Err(TimelineError::Config(format!(
                "snap distance must not be negative, got {}",
                self.snap_distance
            )));
        }
        Ok(())
    }

    pub fn with_snap_distance(mut self, frames: i64) -> Self {
        self.snap_distance = frames;
        self
    }
}
