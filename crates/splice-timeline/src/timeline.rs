//! The timeline facade.
//!
//! [`Timeline`] is the only way callers mutate the model. Every request runs
//! inside a transaction: primitive steps are applied and recorded as they
//! go, a failure undoes them newest-first, and a success becomes one entry
//! on the undo stack. Change events are only delivered once a request has
//! committed.

use splice_core::{Id, Result, TimelineError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::clip::{MediaHandle, MediaRef, MediaResolver};
use crate::config::TimelineConfig;
use crate::edit::{self, Edge, Editor, TrimMode};
use crate::events::{coalesce, TimelineEvent, TimelineObserver};
use crate::properties::{self, PropertyValue};
use crate::snapshot::TimelineSnapshot;
use crate::store::TimelineStore;
use crate::track::TrackKind;
use crate::undo::{Transaction, UndoStack};

/// An editable timeline with undo history and change observers.
pub struct Timeline {
    store: TimelineStore,
    history: UndoStack,
    observers: Vec<Arc<dyn TimelineObserver>>,
    /// Committed events held back for the owner to deliver.
    pending: Vec<TimelineEvent>,
    defer_delivery: bool,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::from_store(TimelineStore::new(TimelineConfig::default()))
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("tracks", &self.store.tracks_count())
            .field("clips", &self.store.clips_count())
            .field("history", &self.history.len())
            .field("observers", &self.observers.len())
            .field("pending_events", &self.pending.len())
            .finish()
    }
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new(config: TimelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_store(TimelineStore::new(config)))
    }

    fn from_store(store: TimelineStore) -> Self {
        Self {
            store,
            history: UndoStack::new(),
            observers: Vec::new(),
            pending: Vec::new(),
            defer_delivery: false,
        }
    }

    /// Rebuild a timeline from a snapshot. The undo history starts empty.
    pub fn from_snapshot(snapshot: &TimelineSnapshot) -> Result<Self> {
        let store = snapshot.restore()?;
        tracing::info!(
            tracks = store.tracks_count(),
            clips = store.clips_count(),
            "Timeline restored from snapshot"
        );
        Ok(Self::from_store(store))
    }

    pub fn snapshot(&self) -> Result<TimelineSnapshot> {
        TimelineSnapshot::capture(&self.store)
    }

    /// Read access to the entity graph.
    pub fn store(&self) -> &TimelineStore {
        &self.store
    }

    pub fn config(&self) -> &TimelineConfig {
        self.store.config()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Register an observer for committed changes.
    ///
    /// Observers run on the committing thread once the change is complete.
    /// Behind a [`SharedTimeline`](crate::SharedTimeline) they run after the
    /// write lock is released, so they may read the timeline.
    pub fn subscribe(&mut self, observer: Arc<dyn TimelineObserver>) {
        self.observers.push(observer);
    }

    /// Hold committed events back until [`take_pending`](Self::take_pending).
    pub(crate) fn defer_delivery(&mut self) {
        self.defer_delivery = true;
    }

    /// Events held back since the last call, with the observers they go to.
    pub(crate) fn take_pending(&mut self) -> (Vec<TimelineEvent>, Vec<Arc<dyn TimelineObserver>>) {
        if self.pending.is_empty() {
            return (Vec::new(), Vec::new());
        }
        (std::mem::take(&mut self.pending), self.observers.clone())
    }

    // ── Transactions ────────────────────────────────────────────

    /// Run `f` as one atomic request.
    ///
    /// If `f` fails, everything it did is undone and the error returned. If
    /// it succeeds, its steps become one undo entry named `label`; with
    /// `label = None` the change is applied but not recorded.
    pub fn transaction<T>(
        &mut self,
        label: Option<&str>,
        f: impl FnOnce(&mut Editor<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut tx = Transaction::new();
        let result = f(&mut Editor::new(&mut self.store, &mut tx));
        match result {
            Ok(value) => {
                if let Some(label) = label {
                    if !tx.is_empty() {
                        let (undo, redo) = tx.into_actions();
                        self.history.push(undo, redo, label);
                    }
                }
                self.flush_events();
                Ok(value)
            }
            Err(err) => {
                let label = label.unwrap_or("");
                if err.is_invariant_violation() {
                    tracing::debug!(%err, steps = tx.len(), label, "Request refused");
                } else {
                    tracing::warn!(%err, steps = tx.len(), label, "Request rolled back");
                }
                tx.rollback(&mut self.store);
                self.store.discard_events();
                Err(err)
            }
        }
    }

    fn flush_events(&mut self) {
        let events = coalesce(self.store.take_events());
        if events.is_empty() {
            return;
        }
        if self.defer_delivery {
            self.pending.extend(events);
        } else {
            notify(&self.observers, &events);
        }
    }

    // ── Undo / redo ─────────────────────────────────────────────

    /// Revert the last entry, returning its label.
    pub fn undo(&mut self) -> Result<String> {
        let result = self.history.undo(&mut self.store).map(str::to_string);
        self.finish_history(result)
    }

    /// Replay the next entry, returning its label.
    pub fn redo(&mut self) -> Result<String> {
        let result = self.history.redo(&mut self.store).map(str::to_string);
        self.finish_history(result)
    }

    fn finish_history(&mut self, result: Result<String>) -> Result<String> {
        match result {
            Ok(label) => {
                self.flush_events();
                Ok(label)
            }
            Err(err @ (TimelineError::NothingToUndo | TimelineError::NothingToRedo)) => Err(err),
            Err(err) => {
                tracing::error!(%err, "History replay failed");
                self.store.discard_events();
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Label of the entry [`undo`](Self::undo) would revert, for menus.
    pub fn undo_label(&self) -> Option<&str> {
        self.history.undo_label()
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.history.redo_label()
    }

    // ── Requests ────────────────────────────────────────────────

    /// Move an item (and its group) to `position` on `track`.
    pub fn request_item_move(&mut self, id: Id, track: Id, position: i64, snap: bool) -> Result<i64> {
        tracing::debug!(item = %id, track = %track, position, snap, "Move item");
        self.transaction(Some("Move item"), |ed| ed.move_item(id, track, position, snap))
    }

    /// Shift a whole group by track ordinals and frames.
    pub fn request_group_move(&mut self, id: Id, delta_track: isize, delta_position: i64) -> Result<()> {
        tracing::debug!(item = %id, delta_track, delta_position, "Move group");
        self.transaction(Some("Move group"), |ed| {
            ed.move_group(id, delta_track, delta_position)
        })
    }

    /// Where a drag would land. Changes nothing.
    pub fn suggest_item_move(&self, id: Id, track: Id, position: i64, snap: bool) -> Result<i64> {
        edit::suggest_item_move(&self.store, id, track, position, snap)
    }

    pub fn request_clip_insertion(&mut self, media: MediaRef, track: Id, position: i64) -> Result<Id> {
        tracing::debug!(media = %media.handle.0, track = %track, position, "Insert clip");
        self.transaction(Some("Insert clip"), |ed| ed.insert_clip(media, track, position))
    }

    pub fn request_clip_insertion_range(
        &mut self,
        media: MediaRef,
        track: Id,
        position: i64,
        in_point: i64,
        out_point: i64,
    ) -> Result<Id> {
        tracing::debug!(media = %media.handle.0, track = %track, position, in_point, out_point, "Insert clip");
        self.transaction(Some("Insert clip"), |ed| {
            ed.insert_clip_range(media, track, position, in_point, out_point)
        })
    }

    /// Resolve `handle` and insert a clip for it. Resolution happens
    /// before the request starts.
    pub fn request_media_insertion(
        &mut self,
        handle: MediaHandle,
        resolver: &dyn MediaResolver,
        track: Id,
        position: i64,
    ) -> Result<Id> {
        let media = MediaRef::resolve(handle, resolver)?;
        self.request_clip_insertion(media, track, position)
    }

    pub fn request_composition_insertion(
        &mut self,
        service: &str,
        track: Id,
        position: i64,
        duration: i64,
        a_track: Option<Id>,
    ) -> Result<Id> {
        tracing::debug!(service, track = %track, position, duration, "Insert composition");
        self.transaction(Some("Insert composition"), |ed| {
            ed.insert_composition(service, track, position, duration, a_track)
        })
    }

    pub fn request_composition_a_track(&mut self, id: Id, a_track: Option<Id>) -> Result<()> {
        self.transaction(Some("Change composition track"), |ed| {
            ed.set_composition_a_track(id, a_track)
        })
    }

    /// Delete an item; a grouped item takes its whole group with it.
    pub fn request_item_deletion(&mut self, id: Id) -> Result<()> {
        tracing::debug!(item = %id, "Delete item");
        self.transaction(Some("Delete item"), |ed| ed.delete_item(id))
    }

    pub fn request_item_resize(&mut self, id: Id, size: i64, edge: Edge, snap: bool) -> Result<i64> {
        tracing::debug!(item = %id, size, ?edge, snap, "Resize item");
        self.transaction(Some("Resize item"), |ed| ed.resize_item(id, size, edge, snap))
    }

    pub fn request_item_trim(&mut self, id: Id, delta: i64, edge: Edge, mode: TrimMode) -> Result<()> {
        tracing::debug!(item = %id, delta, ?edge, ?mode, "Trim item");
        let label = match mode {
            TrimMode::Resize => "Trim item",
            TrimMode::Ripple => "Ripple trim",
            TrimMode::Roll => "Roll edit",
            TrimMode::Slip => "Slip item",
        };
        self.transaction(Some(label), |ed| ed.trim_item(id, delta, edge, mode))
    }

    pub fn request_items_group(&mut self, ids: &[Id]) -> Result<Id> {
        tracing::debug!(count = ids.len(), "Group items");
        self.transaction(Some("Group items"), |ed| ed.group_items(ids))
    }

    pub fn request_item_ungroup(&mut self, id: Id) -> Result<()> {
        tracing::debug!(item = %id, "Ungroup");
        self.transaction(Some("Ungroup items"), |ed| ed.ungroup_item(id))
    }

    /// Insert an empty track at `ordinal`, or at the end.
    pub fn request_track_insertion(&mut self, ordinal: Option<usize>, kind: TrackKind) -> Result<Id> {
        tracing::debug!(?ordinal, ?kind, "Insert track");
        self.transaction(Some("Insert track"), |ed| ed.insert_track(ordinal, kind))
    }

    pub fn request_track_deletion(&mut self, id: Id) -> Result<()> {
        tracing::debug!(track = %id, "Delete track");
        self.transaction(Some("Delete track"), |ed| ed.delete_track(id))
    }

    /// Remove every track and item as one undoable step.
    pub fn request_reset(&mut self) -> Result<()> {
        tracing::info!(tracks = self.store.tracks_count(), "Reset timeline");
        self.transaction(Some("Reset timeline"), |ed| ed.reset())
    }

    pub fn request_guide_add(&mut self, position: i64, comment: &str) -> Result<()> {
        self.transaction(Some("Add guide"), |ed| ed.add_guide(position, comment))
    }

    pub fn request_guide_remove(&mut self, position: i64) -> Result<()> {
        self.transaction(Some("Remove guide"), |ed| ed.remove_guide(position))
    }

    // ── Properties ──────────────────────────────────────────────

    /// Set a property. Not recorded in the undo history.
    pub fn set_property(&mut self, id: Id, key: &str, value: impl Into<PropertyValue>) -> Result<()> {
        self.store.set_property_raw(id, key, Some(value.into()))?;
        self.flush_events();
        Ok(())
    }

    pub fn unset_property(&mut self, id: Id, key: &str) -> Result<()> {
        self.store.set_property_raw(id, key, None)?;
        self.flush_events();
        Ok(())
    }

    pub fn property(&self, id: Id, key: &str) -> Option<&PropertyValue> {
        self.store.property(id, key)
    }

    pub fn set_track_locked(&mut self, track: Id, locked: bool) -> Result<()> {
        self.store.track(track)?;
        self.set_property(track, properties::LOCKED, i64::from(locked))
    }

    /// Set the `hide` bitmask of a track from its two flags.
    pub fn set_track_visibility(&mut self, track: Id, hidden: bool, muted: bool) -> Result<()> {
        self.store.track(track)?;
        let mut mask = 0;
        if hidden {
            mask |= properties::HIDE_VIDEO;
        }
        if muted {
            mask |= properties::HIDE_AUDIO;
        }
        self.set_property(track, properties::HIDE, mask)
    }

    /// Track height in pixels, falling back to the configured default.
    pub fn track_height(&self, track: Id) -> Result<u32> {
        self.store.track(track)?;
        let height = self
            .property(track, properties::HEIGHT)
            .and_then(PropertyValue::as_int)
            .and_then(|h| u32::try_from(h).ok());
        Ok(height.unwrap_or(self.config().default_track_height))
    }

    pub fn display_name(&self, id: Id) -> Result<String> {
        self.store.display_name(id)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn tracks_count(&self) -> usize {
        self.store.tracks_count()
    }

    pub fn track_ids(&self) -> &[Id] {
        self.store.track_ids()
    }

    pub fn track_ordinal(&self, track: Id) -> Result<usize> {
        self.store.track_ordinal(track)
    }

    pub fn track_items(&self, track: Id) -> Result<Vec<Id>> {
        self.store.track_items(track)
    }

    pub fn clips_count(&self) -> usize {
        self.store.clips_count()
    }

    pub fn compositions_count(&self) -> usize {
        self.store.compositions_count()
    }

    pub fn item_track_id(&self, id: Id) -> Result<Option<Id>> {
        self.store.item_track_id(id)
    }

    pub fn item_position(&self, id: Id) -> Result<i64> {
        self.store.item_position(id)
    }

    pub fn item_duration(&self, id: Id) -> Result<i64> {
        self.store.item_duration(id)
    }

    pub fn item_at(&self, track: Id, frame: i64) -> Result<Option<Id>> {
        self.store.item_at(track, frame)
    }

    pub fn group_elements(&self, id: Id) -> BTreeSet<Id> {
        self.store.group_elements(id)
    }

    pub fn is_grouped(&self, id: Id) -> bool {
        self.store.is_grouped(id)
    }

    pub fn guides(&self) -> &BTreeMap<i64, String> {
        self.store.guides()
    }

    /// End of the last item, in frames.
    pub fn duration(&self) -> i64 {
        self.store.duration()
    }

    /// Duration in seconds at the configured frame rate.
    pub fn duration_seconds(&self) -> f64 {
        self.config().frame_rate.frames_to_seconds(self.duration())
    }
}

pub(crate) fn notify(observers: &[Arc<dyn TimelineObserver>], events: &[TimelineEvent]) {
    for event in events {
        for observer in observers {
            observer.on_event(event);
        }
    }
}

/// Forward events to a closure, for callers that do not need a type.
pub fn observer(f: impl Fn(&TimelineEvent) + Send + Sync + 'static) -> Arc<dyn TimelineObserver> {
    Arc::new(f)
}
