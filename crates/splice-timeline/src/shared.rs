//! Thread-shareable timeline handle.
//!
//! Readers take the lock shared, every request takes it exclusively for the
//! whole request, so a reader never sees a half-applied edit. Change events
//! are queued while the lock is held and delivered after it is released.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use splice_core::{Id, Result};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::clip::{MediaHandle, MediaRef, MediaResolver};
use crate::edit::Editor;
use crate::timeline::{notify, Timeline};

/// A [`Timeline`] behind an `Arc<RwLock>`. Cloning shares the timeline.
#[derive(Debug, Clone)]
pub struct SharedTimeline {
    inner: Arc<RwLock<Timeline>>,
}

impl Default for SharedTimeline {
    fn default() -> Self {
        Self::new(Timeline::default())
    }
}

impl SharedTimeline {
    pub fn new(mut timeline: Timeline) -> Self {
        timeline.defer_delivery();
        Self {
            inner: Arc::new(RwLock::new(timeline)),
        }
    }

    /// Shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, Timeline> {
        self.inner.read()
    }

    /// Exclusive access for a sequence of requests. Observers hear about
    /// the committed changes when the guard is dropped.
    pub fn write(&self) -> TimelineWriteGuard<'_> {
        TimelineWriteGuard {
            guard: self.inner.write(),
        }
    }

    /// Run a transaction under the write lock.
    pub fn transaction<T>(
        &self,
        label: Option<&str>,
        f: impl FnOnce(&mut Editor<'_>) -> Result<T>,
    ) -> Result<T> {
        self.write().transaction(label, f)
    }

    /// Resolve media without holding the lock, then insert the clip.
    pub fn insert_media(
        &self,
        handle: MediaHandle,
        resolver: &dyn MediaResolver,
        track: Id,
        position: i64,
    ) -> Result<Id> {
        let media = MediaRef::resolve(handle, resolver)?;
        self.write().request_clip_insertion(media, track, position)
    }

    pub fn undo(&self) -> Result<String> {
        self.write().undo()
    }

    pub fn redo(&self) -> Result<String> {
        self.write().redo()
    }
}

/// Write access to a [`SharedTimeline`].
pub struct TimelineWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, Timeline>,
}

impl Deref for TimelineWriteGuard<'_> {
    type Target = Timeline;

    fn deref(&self) -> &Timeline {
        &self.guard
    }
}

impl DerefMut for TimelineWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Timeline {
        &mut self.guard
    }
}

impl Drop for TimelineWriteGuard<'_> {
    fn drop(&mut self) {
        let (events, observers) = self.guard.take_pending();
        if events.is_empty() {
            return;
        }
        RwLockWriteGuard::unlocked(&mut self.guard, || notify(&observers, &events));
    }
}
