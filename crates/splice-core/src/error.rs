//! Error types for Splice.

use thiserror::Error;

use crate::id::Id;

/// Main error type for timeline operations.
///
/// The first group of variants are invariant violations a user can trigger
/// (and that the timeline recovers from by rolling back); `NotFound` covers
/// ids that do not refer to a live entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("placement would overlap item {conflicting}")]
    Collision { conflicting: Id },

    #[error("out of range: {0}")]
    Range(String),

    #[error("duration {duration} is below the one-frame minimum")]
    TooSmall { duration: i64 },

    #[error("id {0} does not refer to a live entity")]
    NotFound(Id),

    #[error("invalid group operation: {0}")]
    InvalidGroup(String),

    #[error("grouping needs at least two top-level members, got {0}")]
    EmptySet(usize),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("media error: {0}")]
    Media(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TimelineError {
    /// True for failures caused by a request that breaks a structural
    /// invariant, as opposed to misuse (unknown ids) or ambient failures.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::Collision { .. }
                | Self::Range(_)
                | Self::TooSmall { .. }
                | Self::InvalidGroup(_)
                | Self::EmptySet(_)
        )
    }
}

/// Result type alias for timeline operations.
pub type Result<T> = std::result::Result<T, TimelineError>;
