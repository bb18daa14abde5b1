//! Compositions: placements that blend their track with another one.

use serde::{Deserialize, Serialize};
use splice_core::Id;

/// A composition on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub id: Id,
    /// Owning track, `None` while unplaced
    pub track: Option<Id>,
    pub position: i64,
    pub duration: i64,
    /// Secondary track this composition blends with
    pub a_track: Option<Id>,
    /// Blend service name (e.g. "composite", "luma")
    pub service: String,
}

impl Composition {
    pub fn new(id: Id, service: impl Into<String>, duration: i64, a_track: Option<Id>) -> Self {
        Self {
            id,
            track: None,
            position: 0,
            duration,
            a_track,
            service: service.into(),
        }
    }
}
