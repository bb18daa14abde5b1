//! Splice Core - Foundation types for the timeline model
//!
//! This crate provides the small vocabulary shared by the timeline crates:
//! - Entity ids and the id registry
//! - Frame-based time (FrameRate, FrameRange)
//! - The timeline error taxonomy

pub mod error;
pub mod id;
pub mod time;

pub use error::{Result, TimelineError};
pub use id::{Id, IdRegistry};
pub use time::{FrameRange, FrameRate};
