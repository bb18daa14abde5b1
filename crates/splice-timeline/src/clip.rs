//! Clip types for the timeline.

use serde::{Deserialize, Serialize};
use splice_core::{Id, Result, TimelineError};

/// Opaque handle of a media source, owned by the media engine.
///
/// The timeline never looks inside it; it only stores it and hands it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHandle(pub String);

impl MediaHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

/// What the media engine knows about a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    /// Source length in frames.
    pub length: i64,
    /// Stable identifier (usually the resource path), used for display and hashing.
    pub stable_id: String,
}

/// Resolves media handles to their source length and identifier.
///
/// Implemented by the media engine. Resolution happens before a request
/// enters the timeline, so no mutation ever waits on it.
pub trait MediaResolver {
    fn resolve(&self, handle: &MediaHandle) -> Result<MediaInfo>;
}

/// Reference to a media source, as stored on a clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Handle given by the media engine
    pub handle: MediaHandle,
    /// Source length in frames
    pub source_length: i64,
    /// Stable identifier string
    pub stable_id: String,
}

impl MediaRef {
    /// Create a media reference from already-known values.
    pub fn new(handle: MediaHandle, source_length: i64, stable_id: impl Into<String>) -> Self {
        Self {
            handle,
            source_length,
            stable_id: stable_id.into(),
        }
    }

    /// Ask the media engine about `handle`.
    pub fn resolve(handle: MediaHandle, resolver: &dyn MediaResolver) -> Result<Self> {
        let info = resolver.resolve(&handle)?;
        if info.length < 1 {
            return Err(TimelineError::Media(format!(
                "media {} reports length {}",
                info.stable_id, info.length
            )));
        }
        Ok(Self::new(handle, info.length, info.stable_id))
    }

    /// File name part of the stable id, for display.
    pub fn display_name(&self) -> &str {
        std::path::Path::new(&self.stable_id)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.stable_id)
    }
}

/// A clip on the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID
    pub id: Id,
    /// Owning track, `None` while unplaced
    pub track: Option<Id>,
    /// Start position on the track
    pub position: i64,
    /// Source in point (inclusive)
    pub in_point: i64,
    /// Source out point (exclusive)
    pub out_point: i64,
    /// Reference to source media
    pub media: MediaRef,
}

impl Clip {
    /// Create an unplaced clip covering the whole source.
    pub fn new(id: Id, media: MediaRef) -> Self {
        Self {
            id,
            track: None,
            position: 0,
            in_point: 0,
            out_point: media.source_length,
            media,
        }
    }

    /// Length on the timeline.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.out_point - self.in_point
    }

    /// Check that an in/out pair stays inside the source media.
    pub fn check_source_bounds(&self, in_point: i64, out_point: i64) -> Result<()> {
        if in_point < 0 || out_point > self.media.source_length {
            return Err(TimelineError::Range(format!(
                "clip {} source window [{in_point}, {out_point}) exceeds media length {}",
                self.id, self.media.source_length
            )));
        }
        Ok(())
    }
}
