//! Entity identifiers.
//!
//! Tracks, clips, compositions and groups share one id space. Ids are handed
//! out by a single [`IdRegistry`] and are never reused, even after the
//! entity they named is deleted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a timeline entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id allocator.
///
/// Owned by exactly one timeline store; allocation takes `&mut self`, so two
/// writers can never race on the counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRegistry {
    next: u64,
}

impl IdRegistry {
    /// Create a registry whose first id is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id.
    pub fn next_id(&mut self) -> Id {
        let id = Id(self.next);
        self.next += 1;
        id
    }

    /// Number of ids issued so far (also the value of the next id).
    pub fn issued(&self) -> u64 {
        self.next
    }

    /// Make sure `id` is never handed out again. Used when entities come
    /// from a snapshot rather than from this registry.
    pub fn reserve_through(&mut self, id: Id) {
        self.next = self.next.max(id.0.saturating_add(1));
    }
}
