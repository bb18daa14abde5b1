//! Splice Timeline - Timeline data model
//!
//! Implements the editable model of a nonlinear-editing timeline:
//! - Tracks holding non-overlapping clips and compositions
//! - Nested groups that move together
//! - Snapping to item boundaries and guides
//! - Atomic requests with rollback and undo/redo
//! - Trim modes (resize, ripple, roll, slip)
//! - Versioned snapshots

pub mod clip;
pub mod composition;
pub mod config;
pub mod edit;
pub mod events;
pub mod groups;
pub mod properties;
pub mod shared;
pub mod snap;
pub mod snapshot;
pub mod store;
pub mod timeline;
pub mod track;
pub mod undo;

pub use clip::{Clip, MediaHandle, MediaInfo, MediaRef, MediaResolver};
pub use composition::Composition;
pub use config::TimelineConfig;
pub use edit::{Edge, Editor, TrimMode};
pub use events::{ChangedField, TimelineEvent, TimelineObserver};
pub use properties::PropertyValue;
pub use shared::{SharedTimeline, TimelineWriteGuard};
pub use snapshot::{TimelineSnapshot, CURRENT_VERSION};
pub use store::{Extent, TimelineStore};
pub use timeline::{observer, Timeline};
pub use track::{Track, TrackKind};
pub use undo::UndoStack;
