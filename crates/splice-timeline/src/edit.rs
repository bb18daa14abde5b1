//! Compound edit operations.
//!
//! An [`Editor`] drives the primitive steps of the store to implement one
//! user-level edit: move, insert, delete, resize, trim, group and the track
//! operations. Each operation is atomic on its own: if any step fails, the
//! steps it already applied are undone before the error is returned, so a
//! caller composing several operations in one transaction can recover from
//! a failed one.

use splice_core::{Id, Result, TimelineError};
use std::collections::BTreeSet;

use crate::clip::{Clip, MediaRef};
use crate::composition::Composition;
use crate::store::{Extent, Item, TimelineStore};
use crate::track::TrackKind;
use crate::undo::Transaction;

// ── Trim types ──────────────────────────────────────────────────

/// Edge of an item an edit acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// The start of the item (its in point).
    Start,
    /// The end of the item (its out point).
    End,
}

/// Trim modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Change the item's length at one edge; nothing else moves.
    Resize,
    /// Change length keeping the start fixed; later items on the track
    /// shift by the same amount.
    Ripple,
    /// Move the cut between the item and its adjacent neighbour; total
    /// duration unchanged.
    Roll,
    /// Shift source in/out within the clip; position and duration unchanged.
    Slip,
}

// ── Editor ──────────────────────────────────────────────────────

/// Mutating access to a timeline for the span of one transaction.
pub struct Editor<'a> {
    store: &'a mut TimelineStore,
    tx: &'a mut Transaction,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(store: &'a mut TimelineStore, tx: &'a mut Transaction) -> Self {
        Self { store, tx }
    }

    /// Read access to the current (partially edited) state.
    pub fn store(&self) -> &TimelineStore {
        self.store
    }

    /// Run `f` as a nested transaction: on error its steps and the events
    /// they produced are dropped before the error is returned.
    fn atomic<T>(&mut self, f: impl FnOnce(&mut Editor<'_>) -> Result<T>) -> Result<T> {
        let mark = self.store.event_mark();
        let mut local = Transaction::new();
        let result = f(&mut Editor::new(&mut *self.store, &mut local));
        match result {
            Ok(value) => {
                self.tx.absorb(local);
                Ok(value)
            }
            Err(err) => {
                tracing::trace!(%err, steps = local.len(), "rolling back nested edit");
                local.rollback(self.store);
                self.store.truncate_events(mark);
                Err(err)
            }
        }
    }

    // ── Moves ───────────────────────────────────────────────────

    /// Move an item to `position` on `track`. A grouped item drags its
    /// whole group along. Returns the position the item ended up at.
    pub fn move_item(&mut self, id: Id, track: Id, position: i64, snap: bool) -> Result<i64> {
        self.atomic(|ed| ed.move_item_steps(id, track, position, snap))
    }

    fn move_item_steps(&mut self, id: Id, track: Id, position: i64, snap: bool) -> Result<i64> {
        let current = self.store.extent(id)?;
        self.store.track(track)?;
        let members = self.store.group_elements(id);
        let position = if snap {
            let excluded = boundaries_of(self.store, &members);
            snapped_move(self.store, position, current.duration(), &excluded)
        } else {
            position
        };

        if self.store.is_grouped(id) {
            let from = current.track.ok_or_else(|| {
                TimelineError::Range(format!("grouped item {id} is not on a track"))
            })?;
            let delta_track =
                self.store.track_ordinal(track)? as isize - self.store.track_ordinal(from)? as isize;
            self.move_group_steps(id, delta_track, position.saturating_sub(current.position))?;
        } else {
            let target = Extent {
                track: Some(track),
                position,
                ..current
            };
            self.store.step_set_extent(self.tx, id, target)?;
        }
        Ok(position)
    }

    /// Shift every leaf of the group containing `id` by `delta_track`
    /// track ordinals and `delta_position` frames.
    pub fn move_group(&mut self, id: Id, delta_track: isize, delta_position: i64) -> Result<()> {
        self.atomic(|ed| ed.move_group_steps(id, delta_track, delta_position))
    }

    fn move_group_steps(&mut self, id: Id, delta_track: isize, delta_position: i64) -> Result<()> {
        if !self.store.is_item(id) && !self.store.is_group(id) {
            return Err(TimelineError::NotFound(id));
        }
        let tracks = self.store.tracks_count() as isize;
        let mut plan = Vec::new();
        for member in self.store.group_elements(id) {
            let extent = self.store.extent(member)?;
            let track = extent.track.ok_or_else(|| {
                TimelineError::Range(format!("group member {member} is not on a track"))
            })?;
            let ordinal = self.store.track_ordinal(track)? as isize;
            let target = ordinal.saturating_add(delta_track);
            if target < 0 || target >= tracks {
                return Err(TimelineError::Range(format!(
                    "group member {member} would move to track ordinal {target} of {tracks}"
                )));
            }
            plan.push((ordinal, extent, member, target as usize));
        }

        // Members moving ahead go first so none lands on one not yet moved.
        plan.sort_by(|a, b| {
            let by_track = if delta_track > 0 {
                b.0.cmp(&a.0)
            } else {
                a.0.cmp(&b.0)
            };
            let by_position = if delta_position > 0 {
                b.1.position.cmp(&a.1.position)
            } else {
                a.1.position.cmp(&b.1.position)
            };
            by_track.then(by_position)
        });

        for (_, extent, member, target) in plan {
            let track = self
                .store
                .track_at(target)
                .ok_or_else(|| TimelineError::Range(format!("no track at ordinal {target}")))?;
            let moved = Extent {
                track: Some(track),
                position: extent.position.saturating_add(delta_position),
                ..extent
            };
            self.store.step_set_extent(self.tx, member, moved)?;
        }
        Ok(())
    }

    // ── Insertion / deletion ────────────────────────────────────

    /// Place a new clip covering its whole source.
    pub fn insert_clip(&mut self, media: MediaRef, track: Id, position: i64) -> Result<Id> {
        let out_point = media.source_length;
        self.insert_clip_range(media, track, position, 0, out_point)
    }

    /// Place a new clip using the source window `[in_point, out_point)`.
    pub fn insert_clip_range(
        &mut self,
        media: MediaRef,
        track: Id,
        position: i64,
        in_point: i64,
        out_point: i64,
    ) -> Result<Id> {
        self.atomic(|ed| {
            let id = ed.store.allocate_id();
            ed.store
                .step_register_item(ed.tx, Item::Clip(Clip::new(id, media)))?;
            let extent = Extent {
                track: Some(track),
                position,
                in_point,
                out_point,
            };
            ed.store.step_set_extent(ed.tx, id, extent)?;
            Ok(id)
        })
    }

    /// Place a new composition blending `track` with `a_track`.
    pub fn insert_composition(
        &mut self,
        service: &str,
        track: Id,
        position: i64,
        duration: i64,
        a_track: Option<Id>,
    ) -> Result<Id> {
        self.atomic(|ed| {
            if let Some(a_track) = a_track {
                ed.store.track(a_track)?;
            }
            let id = ed.store.allocate_id();
            let compo = Composition::new(id, service, duration, a_track);
            ed.store.step_register_item(ed.tx, Item::Composition(compo))?;
            let extent = Extent {
                track: Some(track),
                position,
                in_point: 0,
                out_point: duration,
            };
            ed.store.step_set_extent(ed.tx, id, extent)?;
            Ok(id)
        })
    }

    /// Delete an item. A grouped item takes its whole topmost group with it.
    pub fn delete_item(&mut self, id: Id) -> Result<()> {
        self.atomic(|ed| {
            if ed.store.is_grouped(id) || ed.store.is_group(id) {
                let root = ed.store.groups().root(id);
                let leaves = ed.store.groups().leaves(root);
                ed.dissolve_steps(root)?;
                for leaf in leaves {
                    ed.delete_single_steps(leaf)?;
                }
                Ok(())
            } else {
                ed.delete_single_steps(id)
            }
        })
    }

    /// Remove one item, detaching it from its group first.
    fn delete_single_steps(&mut self, id: Id) -> Result<()> {
        let extent = self.store.extent(id)?;
        self.store.step_detach_from_group(self.tx, id)?;
        if extent.track.is_some() {
            let unplaced = Extent {
                track: None,
                ..extent
            };
            self.store.step_set_extent(self.tx, id, unplaced)?;
        }
        self.store.step_deregister_item(self.tx, id)
    }

    // ── Resize / trim ───────────────────────────────────────────

    /// Give an item a new length by moving one edge. With `snap`, the
    /// moving edge sticks to the nearest boundary in range. Returns the
    /// length applied.
    pub fn resize_item(&mut self, id: Id, size: i64, edge: Edge, snap: bool) -> Result<i64> {
        self.atomic(|ed| {
            let current = ed.store.extent(id)?;
            let size = if snap && current.track.is_some() {
                let excluded = [current.position, current.end()];
                let max = ed.store.config().snap_distance;
                match edge {
                    Edge::End => ed
                        .store
                        .snaps()
                        .nearest_excluding(current.position.saturating_add(size), max, &excluded)
                        .map_or(size, |p| p - current.position),
                    Edge::Start => ed
                        .store
                        .snaps()
                        .nearest_excluding(current.end().saturating_sub(size), max, &excluded)
                        .map_or(size, |p| current.end() - p),
                }
            } else {
                size
            };
            let resized = match edge {
                Edge::End => Extent {
                    out_point: current.in_point.saturating_add(size),
                    ..current
                },
                Edge::Start => {
                    move_start(ed.store, id, current, current.duration().saturating_sub(size))
                }
            };
            ed.store.step_set_extent(ed.tx, id, resized)?;
            Ok(size)
        })
    }

    /// Trim an item by `delta` frames at `edge`. Positive `delta` makes
    /// the item longer, except for roll and slip where it moves the cut or
    /// the source window later.
    pub fn trim_item(&mut self, id: Id, delta: i64, edge: Edge, mode: TrimMode) -> Result<()> {
        self.atomic(|ed| match mode {
            TrimMode::Resize => {
                let size = ed.store.item_duration(id)?.saturating_add(delta);
                let current = ed.store.extent(id)?;
                let resized = match edge {
                    Edge::End => Extent {
                        out_point: current.in_point.saturating_add(size),
                        ..current
                    },
                    Edge::Start => move_start(ed.store, id, current, delta.saturating_neg()),
                };
                ed.store.step_set_extent(ed.tx, id, resized)
            }
            TrimMode::Ripple => ed.ripple_steps(id, delta, edge),
            TrimMode::Roll => ed.roll_steps(id, delta, edge),
            TrimMode::Slip => {
                if !ed.store.is_clip(id) {
                    ed.store.extent(id)?;
                    return Err(TimelineError::Range(format!(
                        "item {id} has no source window to slip"
                    )));
                }
                let current = ed.store.extent(id)?;
                let slipped = Extent {
                    in_point: current.in_point.saturating_add(delta),
                    out_point: current.out_point.saturating_add(delta),
                    ..current
                };
                ed.store.step_set_extent(ed.tx, id, slipped)
            }
        })
    }

    fn ripple_steps(&mut self, id: Id, delta: i64, edge: Edge) -> Result<()> {
        let current = self.store.extent(id)?;
        let track = current
            .track
            .ok_or_else(|| TimelineError::Range(format!("item {id} is not on a track")))?;
        let trimmed = match edge {
            Edge::End => Extent {
                out_point: current.out_point.saturating_add(delta),
                ..current
            },
            Edge::Start if self.store.is_clip(id) => Extent {
                in_point: current.in_point.saturating_sub(delta),
                ..current
            },
            Edge::Start => Extent {
                out_point: current.out_point.saturating_add(delta),
                ..current
            },
        };
        let followers: Vec<(Id, Extent)> = self
            .store
            .track(track)?
            .placements_from(current.end())
            .filter(|p| p.id != id)
            .map(|p| self.store.extent(p.id).map(|e| (p.id, e)))
            .collect::<Result<_>>()?;

        if delta > 0 {
            for (follower, extent) in followers.iter().rev() {
                self.shift_steps(*follower, *extent, delta)?;
            }
            self.store.step_set_extent(self.tx, id, trimmed)
        } else {
            self.store.step_set_extent(self.tx, id, trimmed)?;
            for (follower, extent) in &followers {
                self.shift_steps(*follower, *extent, delta)?;
            }
            Ok(())
        }
    }

    fn shift_steps(&mut self, id: Id, extent: Extent, delta: i64) -> Result<()> {
        let shifted = Extent {
            position: extent.position.saturating_add(delta),
            ..extent
        };
        self.store.step_set_extent(self.tx, id, shifted)
    }

    fn roll_steps(&mut self, id: Id, delta: i64, edge: Edge) -> Result<()> {
        let current = self.store.extent(id)?;
        let track = current
            .track
            .ok_or_else(|| TimelineError::Range(format!("item {id} is not on a track")))?;
        let neighbour = match edge {
            Edge::End => self.store.track(track)?.adjacent_after(id),
            Edge::Start => self.store.track(track)?.adjacent_before(id),
        }
        .ok_or_else(|| TimelineError::Range(format!("item {id} has no adjacent item to roll with")))?;
        if delta == 0 {
            return Ok(());
        }
        let other = self.store.extent(neighbour.id)?;
        let (item_new, other_new) = match edge {
            Edge::End => (
                Extent {
                    out_point: current.out_point.saturating_add(delta),
                    ..current
                },
                move_start(self.store, neighbour.id, other, delta),
            ),
            Edge::Start => (
                move_start(self.store, id, current, delta),
                Extent {
                    out_point: other.out_point.saturating_add(delta),
                    ..other
                },
            ),
        };
        // Shrink first so the cut never overlaps.
        if item_new.duration() < current.duration() {
            self.store.step_set_extent(self.tx, id, item_new)?;
            self.store.step_set_extent(self.tx, neighbour.id, other_new)
        } else {
            self.store.step_set_extent(self.tx, neighbour.id, other_new)?;
            self.store.step_set_extent(self.tx, id, item_new)
        }
    }

    // ── Groups ──────────────────────────────────────────────────

    /// Group the given items (or the topmost groups holding them).
    pub fn group_items(&mut self, ids: &[Id]) -> Result<Id> {
        self.atomic(|ed| {
            let mut roots = BTreeSet::new();
            for &id in ids {
                if !ed.store.is_item(id) && !ed.store.is_group(id) {
                    return Err(TimelineError::NotFound(id));
                }
                roots.insert(ed.store.groups().root(id));
            }
            if roots.len() < 2 {
                return Err(TimelineError::EmptySet(roots.len()));
            }
            let group = ed.store.allocate_id();
            ed.store.step_create_group(ed.tx, group, roots)?;
            Ok(group)
        })
    }

    /// Dissolve the topmost group containing `id` and everything under it.
    pub fn ungroup_item(&mut self, id: Id) -> Result<()> {
        self.atomic(|ed| {
            if !ed.store.is_grouped(id) && !ed.store.is_group(id) {
                if !ed.store.is_item(id) {
                    return Err(TimelineError::NotFound(id));
                }
                return Err(TimelineError::InvalidGroup(format!("{id} is not in a group")));
            }
            let root = ed.store.groups().root(id);
            ed.dissolve_steps(root)
        })
    }

    fn dissolve_steps(&mut self, root: Id) -> Result<()> {
        for group in self.store.groups().subtree_groups(root) {
            self.store.step_remove_group(self.tx, group)?;
        }
        Ok(())
    }

    // ── Tracks ──────────────────────────────────────────────────

    /// Insert an empty track at `ordinal`, or after the last one.
    pub fn insert_track(&mut self, ordinal: Option<usize>, kind: TrackKind) -> Result<Id> {
        self.atomic(|ed| {
            let id = ed.store.allocate_id();
            ed.store.step_register_track(ed.tx, id, kind, ordinal)?;
            Ok(id)
        })
    }

    /// Delete a track together with its items.
    pub fn delete_track(&mut self, id: Id) -> Result<()> {
        self.atomic(|ed| ed.delete_track_steps(id))
    }

    fn delete_track_steps(&mut self, id: Id) -> Result<()> {
        for item in self.store.track_items(id)? {
            self.delete_single_steps(item)?;
        }
        let blending: Vec<Id> = self
            .store
            .composition_ids()
            .into_iter()
            .filter(|c| {
                self.store
                    .composition(*c)
                    .map_or(false, |compo| compo.a_track == Some(id))
            })
            .collect();
        for compo in blending {
            self.store.step_set_a_track(self.tx, compo, None)?;
        }
        self.store.step_deregister_track(self.tx, id)
    }

    /// Delete every track and item.
    pub fn reset(&mut self) -> Result<()> {
        self.atomic(|ed| {
            let tracks: Vec<Id> = ed.store.track_ids().to_vec();
            for track in tracks.into_iter().rev() {
                ed.delete_track_steps(track)?;
            }
            Ok(())
        })
    }

    /// Change the track a composition blends with.
    pub fn set_composition_a_track(&mut self, id: Id, a_track: Option<Id>) -> Result<()> {
        self.atomic(|ed| ed.store.step_set_a_track(ed.tx, id, a_track))
    }

    // ── Guides ──────────────────────────────────────────────────

    /// Add a guide, replacing the comment of an existing one.
    pub fn add_guide(&mut self, position: i64, comment: &str) -> Result<()> {
        if position < 0 {
            return Err(TimelineError::Range(format!(
                "guide position {position} is negative"
            )));
        }
        let comment = comment.to_string();
        self.atomic(|ed| ed.store.step_set_guide(ed.tx, position, Some(comment)))
    }

    pub fn remove_guide(&mut self, position: i64) -> Result<()> {
        if !self.store.guides().contains_key(&position) {
            return Err(TimelineError::Range(format!("no guide at {position}")));
        }
        self.atomic(|ed| ed.store.step_set_guide(ed.tx, position, None))
    }
}

// ── Read-only helpers ───────────────────────────────────────────

/// Where a drag of `id` to `position` on `track` would land, without
/// changing anything.
///
/// Snapping ignores the boundaries of the whole group being dragged. Only
/// the dragged item's own footprint is checked: if it fits, the (snapped)
/// position is returned, otherwise the closest start on `track` where it
/// fits.
pub fn suggest_item_move(
    store: &TimelineStore,
    id: Id,
    track: Id,
    position: i64,
    snap: bool,
) -> Result<i64> {
    let current = store.extent(id)?;
    let target = store.track(track)?;
    if current.track == Some(track) && current.position == position {
        return Ok(position);
    }
    let duration = current.duration();
    // Keep the end representable.
    let position = position.min(i64::MAX - duration);
    let position = if snap {
        let excluded = boundaries_of(store, &store.group_elements(id));
        snapped_move(store, position, duration, &excluded)
    } else {
        position
    };
    let fits = position >= 0
        && target
            .conflict(splice_core::FrameRange::new(position, duration), Some(id))
            .is_none();
    if fits {
        Ok(position)
    } else {
        Ok(target.nearest_free_start(position, duration, Some(id)))
    }
}

/// Start and end of every placed item in `ids`.
fn boundaries_of(store: &TimelineStore, ids: &BTreeSet<Id>) -> Vec<i64> {
    ids.iter()
        .filter_map(|id| store.extent(*id).ok())
        .filter(|e| e.track.is_some())
        .flat_map(|e| [e.position, e.end()])
        .collect()
}

/// Snap a move: first the start edge, then the end edge.
fn snapped_move(store: &TimelineStore, position: i64, duration: i64, excluded: &[i64]) -> i64 {
    let max = store.config().snap_distance;
    let snaps = store.snaps();
    snaps
        .nearest_excluding(position, max, excluded)
        .or_else(|| {
            snaps
                .nearest_excluding(position.saturating_add(duration), max, excluded)
                .map(|end| end - duration)
        })
        .filter(|p| *p >= 0)
        .unwrap_or(position)
}

/// Move the start edge of an item by `delta`, keeping its end in place.
fn move_start(store: &TimelineStore, id: Id, extent: Extent, delta: i64) -> Extent {
    if store.is_clip(id) {
        Extent {
            position: extent.position.saturating_add(delta),
            in_point: extent.in_point.saturating_add(delta),
            ..extent
        }
    } else {
        Extent {
            position: extent.position.saturating_add(delta),
            out_point: extent.out_point.saturating_sub(delta),
            ..extent
        }
    }
}
