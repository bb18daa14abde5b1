//! Entity arena and primitive reversible steps.
//!
//! The store owns every track, clip, composition and group, keyed by id.
//! Cross references (item → track, member → group, composition → A-track)
//! are ids resolved here, never pointers.
//!
//! Mutation comes in two layers:
//! - `*_raw` functions validate and apply one change, recording change
//!   events. They are what undo/redo actions call.
//! - `step_*` functions wrap a raw change into a (undo, redo) pair, apply it
//!   and record it into a [`Transaction`].

use splice_core::{FrameRange, Id, IdRegistry, Result, TimelineError};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::clip::Clip;
use crate::composition::Composition;
use crate::config::TimelineConfig;
use crate::events::{ChangedField, ChangedFields, TimelineEvent};
use crate::groups::GroupTree;
use crate::properties::{self, PropertyMap, PropertyStore, PropertyValue};
use crate::snap::SnapIndex;
use crate::track::{Track, TrackKind};
use crate::undo::{Fun, Transaction};

/// Placement state of an item: `(track, position, in, out)`.
///
/// Compositions have no source window; their extent is `in = 0`,
/// `out = duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub track: Option<Id>,
    pub position: i64,
    pub in_point: i64,
    pub out_point: i64,
}

impl Extent {
    #[inline]
    pub fn duration(&self) -> i64 {
        self.out_point.saturating_sub(self.in_point)
    }

    #[inline]
    pub fn range(&self) -> FrameRange {
        FrameRange::new(self.position, self.duration())
    }

    pub fn end(&self) -> i64 {
        self.position.saturating_add(self.duration())
    }
}

/// A clip or a composition, as registered in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Clip(Clip),
    Composition(Composition),
}

impl Item {
    pub fn id(&self) -> Id {
        match self {
            Item::Clip(c) => c.id,
            Item::Composition(c) => c.id,
        }
    }

    pub fn track(&self) -> Option<Id> {
        match self {
            Item::Clip(c) => c.track,
            Item::Composition(c) => c.track,
        }
    }
}

/// The entity graph of one timeline.
#[derive(Debug)]
pub struct TimelineStore {
    config: TimelineConfig,
    ids: IdRegistry,
    track_order: Vec<Id>,
    tracks: HashMap<Id, Track>,
    clips: HashMap<Id, Clip>,
    compositions: HashMap<Id, Composition>,
    groups: GroupTree,
    snaps: SnapIndex,
    guides: BTreeMap<i64, String>,
    properties: PropertyStore,
    events: Vec<TimelineEvent>,
}

impl TimelineStore {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            ids: IdRegistry::new(),
            track_order: Vec::new(),
            tracks: HashMap::new(),
            clips: HashMap::new(),
            compositions: HashMap::new(),
            groups: GroupTree::new(),
            snaps: SnapIndex::new(),
            guides: BTreeMap::new(),
            properties: PropertyStore::default(),
            events: Vec::new(),
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Number of ids issued so far, used or not.
    pub fn ids_issued(&self) -> u64 {
        self.ids.issued()
    }

    pub fn tracks_count(&self) -> usize {
        self.track_order.len()
    }

    /// Track ids in ordinal order.
    pub fn track_ids(&self) -> &[Id] {
        &self.track_order
    }

    pub fn track(&self, id: Id) -> Result<&Track> {
        self.tracks.get(&id).ok_or(TimelineError::NotFound(id))
    }

    /// Ordinal of a track among all tracks.
    pub fn track_ordinal(&self, id: Id) -> Result<usize> {
        self.track_order
            .iter()
            .position(|&t| t == id)
            .ok_or(TimelineError::NotFound(id))
    }

    pub fn track_at(&self, ordinal: usize) -> Option<Id> {
        self.track_order.get(ordinal).copied()
    }

    pub fn clips_count(&self) -> usize {
        self.clips.len()
    }

    pub fn compositions_count(&self) -> usize {
        self.compositions.len()
    }

    pub fn clip(&self, id: Id) -> Result<&Clip> {
        self.clips.get(&id).ok_or(TimelineError::NotFound(id))
    }

    pub fn composition(&self, id: Id) -> Result<&Composition> {
        self.compositions.get(&id).ok_or(TimelineError::NotFound(id))
    }

    /// All clip ids, sorted.
    pub fn clip_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.clips.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All composition ids, sorted.
    pub fn composition_ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.compositions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_clip(&self, id: Id) -> bool {
        self.clips.contains_key(&id)
    }

    pub fn is_composition(&self, id: Id) -> bool {
        self.compositions.contains_key(&id)
    }

    pub fn is_track(&self, id: Id) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn is_group(&self, id: Id) -> bool {
        self.groups.is_group(id)
    }

    /// Clip or composition.
    pub fn is_item(&self, id: Id) -> bool {
        self.is_clip(id) || self.is_composition(id)
    }

    pub fn item(&self, id: Id) -> Result<Item> {
        if let Some(clip) = self.clips.get(&id) {
            Ok(Item::Clip(clip.clone()))
        } else if let Some(compo) = self.compositions.get(&id) {
            Ok(Item::Composition(compo.clone()))
        } else {
            Err(TimelineError::NotFound(id))
        }
    }

    pub fn extent(&self, id: Id) -> Result<Extent> {
        if let Some(c) = self.clips.get(&id) {
            Ok(Extent {
                track: c.track,
                position: c.position,
                in_point: c.in_point,
                out_point: c.out_point,
            })
        } else if let Some(c) = self.compositions.get(&id) {
            Ok(Extent {
                track: c.track,
                position: c.position,
                in_point: 0,
                out_point: c.duration,
            })
        } else {
            Err(TimelineError::NotFound(id))
        }
    }

    pub fn item_track_id(&self, id: Id) -> Result<Option<Id>> {
        Ok(self.extent(id)?.track)
    }

    pub fn item_position(&self, id: Id) -> Result<i64> {
        Ok(self.extent(id)?.position)
    }

    /// Length of the item on the timeline (its playtime).
    pub fn item_duration(&self, id: Id) -> Result<i64> {
        Ok(self.extent(id)?.duration())
    }

    /// Items on a track, ordered by id.
    pub fn track_items(&self, track: Id) -> Result<Vec<Id>> {
        Ok(self.track(track)?.items_by_id())
    }

    /// Item covering `frame` on `track`.
    pub fn item_at(&self, track: Id, frame: i64) -> Result<Option<Id>> {
        Ok(self.track(track)?.item_at(frame))
    }

    pub fn groups(&self) -> &GroupTree {
        &self.groups
    }

    /// Leaves of the topmost group containing `id`, or `{id}`.
    pub fn group_elements(&self, id: Id) -> BTreeSet<Id> {
        self.groups.members_of(id)
    }

    pub fn is_grouped(&self, id: Id) -> bool {
        self.groups.is_in_group(id)
    }

    pub fn snaps(&self) -> &SnapIndex {
        &self.snaps
    }

    pub fn guides(&self) -> &BTreeMap<i64, String> {
        &self.guides
    }

    pub fn property(&self, id: Id, key: &str) -> Option<&PropertyValue> {
        self.properties.get(id, key)
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// End of the last item over all tracks.
    pub fn duration(&self) -> i64 {
        self.tracks.values().map(Track::duration).max().unwrap_or(0)
    }

    /// Name to show for an entity: the `name` property if set, otherwise
    /// the media file name for clips, the service for compositions and the
    /// ordinal for tracks.
    pub fn display_name(&self, id: Id) -> Result<String> {
        if let Some(name) = self.property(id, properties::NAME).and_then(PropertyValue::as_str) {
            return Ok(name.to_string());
        }
        if let Some(clip) = self.clips.get(&id) {
            Ok(clip.media.display_name().to_string())
        } else if let Some(compo) = self.compositions.get(&id) {
            Ok(compo.service.clone())
        } else if self.is_track(id) {
            Ok(format!("Track {}", self.track_ordinal(id)? + 1))
        } else if self.is_group(id) {
            Ok(format!("Group {id}"))
        } else {
            Err(TimelineError::NotFound(id))
        }
    }

    /// Snap index computed from scratch from the entities.
    pub fn computed_snaps(&self) -> SnapIndex {
        let mut index = SnapIndex::new();
        let boundaries = self
            .tracks
            .values()
            .flat_map(|t| t.placements().map(|p| p.range))
            .flat_map(|r| [r.start, r.end()]);
        index.rebuild(boundaries.chain(self.guides.keys().copied()));
        index
    }

    /// Cross-check caches and back references. Used by tests and after
    /// loading a snapshot.
    pub fn verify(&self) -> Result<()> {
        for (&tid, track) in &self.tracks {
            for p in track.placements() {
                let extent = self.extent(p.id)?;
                if extent.track != Some(tid) || extent.range() != p.range {
                    return Err(TimelineError::Range(format!(
                        "track {tid} places {} at {} but the item says {:?}",
                        p.id, p.range, extent
                    )));
                }
            }
        }
        for id in self.clips.keys().chain(self.compositions.keys()) {
            if let Some(tid) = self.extent(*id)?.track {
                if !self.track(tid)?.contains(*id) {
                    return Err(TimelineError::Range(format!(
                        "item {id} claims track {tid} but is not placed there"
                    )));
                }
            }
        }
        self.groups.verify()?;
        for gid in self.groups.group_ids() {
            if self.is_item(gid) || self.is_track(gid) {
                return Err(TimelineError::InvalidGroup(format!(
                    "group id {gid} is also used by another entity"
                )));
            }
            let children = self.groups.children(gid).map_or(0, |c| c.len());
            if children < 2 {
                return Err(TimelineError::InvalidGroup(format!(
                    "group {gid} has {children} members"
                )));
            }
            for child in self.groups.children(gid).into_iter().flatten() {
                if !self.is_item(*child) && !self.is_group(*child) {
                    return Err(TimelineError::InvalidGroup(format!(
                        "group {gid} holds dead id {child}"
                    )));
                }
            }
        }
        if self.snaps != self.computed_snaps() {
            return Err(TimelineError::Range("snap index out of sync".into()));
        }
        Ok(())
    }

    // ── Event buffer ────────────────────────────────────────────

    pub(crate) fn take_events(&mut self) -> Vec<TimelineEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn discard_events(&mut self) {
        self.events.clear();
    }

    /// Current length of the event buffer, for [`truncate_events`](Self::truncate_events).
    pub(crate) fn event_mark(&self) -> usize {
        self.events.len()
    }

    /// Drop events recorded after `mark`.
    pub(crate) fn truncate_events(&mut self, mark: usize) {
        self.events.truncate(mark);
    }

    fn emit(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    fn emit_membership(&mut self, leaves: BTreeSet<Id>) {
        if leaves.is_empty() {
            return;
        }
        self.emit(TimelineEvent::ItemsChanged {
            items: leaves.into_iter().collect(),
            fields: ChangedFields::from_slice(&[ChangedField::Membership]),
        });
    }

    // ── Ids ─────────────────────────────────────────────────────

    pub(crate) fn allocate_id(&mut self) -> Id {
        self.ids.next_id()
    }

    pub(crate) fn reserve_id(&mut self, id: Id) {
        self.ids.reserve_through(id);
    }

    // ── Raw mutations ───────────────────────────────────────────

    pub(crate) fn insert_track_raw(&mut self, track: Track, ordinal: usize) -> Result<()> {
        let id = track.id;
        if self.tracks.contains_key(&id) {
            return Err(TimelineError::Range(format!("track {id} already exists")));
        }
        if !track.is_empty() {
            return Err(TimelineError::Range(format!("track {id} must be inserted empty")));
        }
        let ordinal = ordinal.min(self.track_order.len());
        self.track_order.insert(ordinal, id);
        self.tracks.insert(id, track);
        self.emit(TimelineEvent::TrackInserted { track: id, ordinal });
        Ok(())
    }

    pub(crate) fn remove_track_raw(&mut self, id: Id) -> Result<(Track, usize)> {
        let ordinal = self.track_ordinal(id)?;
        let track = self.track(id)?;
        if !track.is_empty() {
            return Err(TimelineError::Range(format!(
                "track {id} still holds {} items",
                track.len()
            )));
        }
        self.track_order.remove(ordinal);
        let track = self.tracks.remove(&id).ok_or(TimelineError::NotFound(id))?;
        self.emit(TimelineEvent::TrackRemoved { track: id });
        Ok((track, ordinal))
    }

    /// Register an unplaced clip or composition.
    pub(crate) fn insert_item_raw(&mut self, item: Item) -> Result<()> {
        let id = item.id();
        if self.is_item(id) || self.is_track(id) || self.is_group(id) {
            return Err(TimelineError::Range(format!("id {id} is already in use")));
        }
        if item.track().is_some() {
            return Err(TimelineError::Range(format!("item {id} must be registered unplaced")));
        }
        match item {
            Item::Clip(clip) => {
                self.clips.insert(id, clip);
            }
            Item::Composition(compo) => {
                self.compositions.insert(id, compo);
            }
        }
        Ok(())
    }

    /// Drop an unplaced, ungrouped item from the arena.
    pub(crate) fn remove_item_raw(&mut self, id: Id) -> Result<Item> {
        let extent = self.extent(id)?;
        if extent.track.is_some() {
            return Err(TimelineError::Range(format!("item {id} is still placed")));
        }
        if self.groups.is_in_group(id) {
            return Err(TimelineError::InvalidGroup(format!("item {id} is still grouped")));
        }
        if let Some(clip) = self.clips.remove(&id) {
            return Ok(Item::Clip(clip));
        }
        self.compositions
            .remove(&id)
            .map(Item::Composition)
            .ok_or(TimelineError::NotFound(id))
    }

    /// Validate and apply a new `(track, position, in, out)` for an item.
    ///
    /// This is the one primitive behind insert-into-track, move, resize and
    /// unplace. On error nothing has changed.
    pub(crate) fn set_extent(&mut self, id: Id, new: Extent) -> Result<()> {
        let old = self.extent(id)?;
        if new.position < 0 {
            return Err(TimelineError::Range(format!(
                "item {id} cannot start at negative position {}",
                new.position
            )));
        }
        let duration = new.duration();
        if duration < 1 {
            return Err(TimelineError::TooSmall { duration });
        }
        if new.out_point.checked_sub(new.in_point).is_none()
            || new.position.checked_add(duration).is_none()
        {
            return Err(TimelineError::Range(format!(
                "item {id} at {} with duration {duration} ends past the last frame",
                new.position
            )));
        }
        if let Some(clip) = self.clips.get(&id) {
            clip.check_source_bounds(new.in_point, new.out_point)?;
        }
        let range = new.range();
        if let Some(tid) = new.track {
            let track = self.track(tid)?;
            if let Some(conflicting) = track.conflict(range, Some(id)) {
                return Err(TimelineError::Collision { conflicting });
            }
        }

        // Validated: from here on nothing can fail.
        if let Some(old_tid) = old.track {
            if let Some(track) = self.tracks.get_mut(&old_tid) {
                track.unplace(id);
            }
            self.snaps.remove(old.position);
            self.snaps.remove(old.end());
        }
        if let Some(tid) = new.track {
            let track = self.tracks.get_mut(&tid).ok_or(TimelineError::NotFound(tid))?;
            track.place(id, range)?;
            self.snaps.add(range.start);
            self.snaps.add(range.end());
        }
        if let Some(clip) = self.clips.get_mut(&id) {
            clip.track = new.track;
            clip.position = new.position;
            clip.in_point = new.in_point;
            clip.out_point = new.out_point;
        } else if let Some(compo) = self.compositions.get_mut(&id) {
            compo.track = new.track;
            compo.position = new.position;
            compo.duration = duration;
        }

        if old.track != new.track {
            if let Some(track) = old.track {
                self.emit(TimelineEvent::ItemRemoved { track, item: id });
            }
            if let Some(track) = new.track {
                self.emit(TimelineEvent::ItemInserted { track, item: id });
            }
        } else {
            let mut fields = ChangedFields::new();
            if old.position != new.position {
                fields.push(ChangedField::Position);
            }
            if old.duration() != duration {
                fields.push(ChangedField::Duration);
            } else if old.in_point != new.in_point {
                fields.push(ChangedField::SourceWindow);
            }
            if !fields.is_empty() {
                self.emit(TimelineEvent::ItemsChanged {
                    items: smallvec::smallvec![id],
                    fields,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn create_group_raw(&mut self, group: Id, children: &BTreeSet<Id>) -> Result<()> {
        if let Some(dead) = children
            .iter()
            .find(|c| !self.is_item(**c) && !self.is_group(**c))
        {
            return Err(TimelineError::NotFound(*dead));
        }
        if self.is_item(group) || self.is_track(group) {
            return Err(TimelineError::InvalidGroup(format!(
                "group id {group} is already used by another entity"
            )));
        }
        self.groups.insert_group(group, children)?;
        let leaves = self.groups.leaves(group);
        self.emit_membership(leaves);
        Ok(())
    }

    pub(crate) fn remove_group_raw(&mut self, group: Id) -> Result<(Option<Id>, BTreeSet<Id>)> {
        let leaves = self.groups.leaves(group);
        let removed = self.groups.remove_group(group)?;
        self.emit_membership(leaves);
        Ok(removed)
    }

    pub(crate) fn link_raw(&mut self, child: Id, parent: Id) -> Result<()> {
        self.groups.link(child, parent)?;
        let leaves = self.groups.leaves(child);
        self.emit_membership(leaves);
        Ok(())
    }

    pub(crate) fn unlink_raw(&mut self, child: Id) -> Result<Id> {
        let parent = self
            .groups
            .unlink(child)
            .ok_or_else(|| TimelineError::InvalidGroup(format!("{child} is not in a group")))?;
        let leaves = self.groups.leaves(child);
        self.emit_membership(leaves);
        Ok(parent)
    }

    pub(crate) fn set_a_track_raw(&mut self, id: Id, a_track: Option<Id>) -> Result<()> {
        if let Some(tid) = a_track {
            self.track(tid)?;
        }
        let compo = self
            .compositions
            .get_mut(&id)
            .ok_or(TimelineError::NotFound(id))?;
        if compo.a_track != a_track {
            compo.a_track = a_track;
            self.emit(TimelineEvent::item_changed(id, &[ChangedField::ATrack]));
        }
        Ok(())
    }

    /// Set or clear the guide at `position`, returning the previous comment.
    pub(crate) fn set_guide_raw(&mut self, position: i64, comment: Option<String>) -> Option<String> {
        let previous = match comment {
            Some(comment) => self.guides.insert(position, comment),
            None => self.guides.remove(&position),
        };
        let now_present = self.guides.contains_key(&position);
        match (previous.is_some(), now_present) {
            (false, true) => self.snaps.add(position),
            (true, false) => {
                self.snaps.remove(position);
            }
            _ => {}
        }
        self.emit(TimelineEvent::GuidesChanged);
        previous
    }

    /// Set (or with `None` clear) a property. Recognized track keys also
    /// update the structural flags. Returns the previous value.
    pub(crate) fn set_property_raw(
        &mut self,
        id: Id,
        key: &str,
        value: Option<PropertyValue>,
    ) -> Result<Option<PropertyValue>> {
        if !self.is_track(id) && !self.is_item(id) && !self.is_group(id) {
            return Err(TimelineError::NotFound(id));
        }
        let flag = value.as_ref().and_then(PropertyValue::as_int).unwrap_or(0);
        if let Some(track) = self.tracks.get_mut(&id) {
            match key {
                properties::LOCKED => track.locked = flag != 0,
                properties::HIDE => {
                    track.hidden = flag & properties::HIDE_VIDEO != 0;
                    track.muted = flag & properties::HIDE_AUDIO != 0;
                }
                _ => {}
            }
        }
        let previous = match value {
            Some(value) => self.properties.set(id, key, value),
            None => self.properties.unset(id, key),
        };
        let fields = properties::fields_for_key(key);
        if !fields.is_empty() {
            let event = if self.is_track(id) {
                TimelineEvent::track_changed(id, fields)
            } else {
                TimelineEvent::item_changed(id, fields)
            };
            self.emit(event);
        }
        Ok(previous)
    }

    /// Bring the id registry past every id in use. Called after loading.
    pub(crate) fn reserve_all_ids(&mut self) {
        let max = self
            .tracks
            .keys()
            .chain(self.clips.keys())
            .chain(self.compositions.keys())
            .chain(self.groups.group_ids().iter())
            .max()
            .copied();
        if let Some(max) = max {
            self.reserve_id(max);
        }
    }

    // ── Reversible steps ────────────────────────────────────────

    /// Run `redo` now and record the pair if it succeeded.
    fn apply(&mut self, tx: &mut Transaction, redo: Fun, undo: Fun) -> Result<()> {
        redo.call(self)?;
        tx.record(undo, redo);
        Ok(())
    }

    pub(crate) fn step_register_track(
        &mut self,
        tx: &mut Transaction,
        id: Id,
        kind: TrackKind,
        ordinal: Option<usize>,
    ) -> Result<()> {
        let ordinal = ordinal.unwrap_or(self.track_order.len());
        if ordinal > self.track_order.len() {
            return Err(TimelineError::Range(format!(
                "track ordinal {ordinal} is past the end ({} tracks)",
                self.track_order.len()
            )));
        }
        let track = Track::new(id, kind);
        self.apply(
            tx,
            Fun::new(move |s| s.insert_track_raw(track.clone(), ordinal)),
            Fun::new(move |s| s.remove_track_raw(id).map(|_| ())),
        )
    }

    /// Remove an empty track, remembering its flags, ordinal and properties.
    pub(crate) fn step_deregister_track(&mut self, tx: &mut Transaction, id: Id) -> Result<()> {
        let ordinal = self.track_ordinal(id)?;
        let track = self.track(id)?.clone();
        let props = self.properties.map(id).cloned().unwrap_or_default();
        self.apply(
            tx,
            Fun::new(move |s| {
                s.remove_track_raw(id)?;
                s.properties.take(id);
                Ok(())
            }),
            Fun::new(move |s| {
                s.insert_track_raw(track.clone(), ordinal)?;
                s.properties.restore(id, props.clone());
                Ok(())
            }),
        )
    }

    pub(crate) fn step_register_item(&mut self, tx: &mut Transaction, item: Item) -> Result<()> {
        let id = item.id();
        self.apply(
            tx,
            Fun::new(move |s| s.insert_item_raw(item.clone())),
            Fun::new(move |s| s.remove_item_raw(id).map(|_| ())),
        )
    }

    /// Drop an unplaced, ungrouped item together with its properties.
    pub(crate) fn step_deregister_item(&mut self, tx: &mut Transaction, id: Id) -> Result<()> {
        let item = self.item(id)?;
        let props: PropertyMap = self.properties.map(id).cloned().unwrap_or_default();
        self.apply(
            tx,
            Fun::new(move |s| {
                s.remove_item_raw(id)?;
                s.properties.take(id);
                Ok(())
            }),
            Fun::new(move |s| {
                s.insert_item_raw(item.clone())?;
                s.properties.restore(id, props.clone());
                Ok(())
            }),
        )
    }

    pub(crate) fn step_set_extent(&mut self, tx: &mut Transaction, id: Id, new: Extent) -> Result<()> {
        let old = self.extent(id)?;
        if old == new {
            return Ok(());
        }
        self.apply(
            tx,
            Fun::new(move |s| s.set_extent(id, new)),
            Fun::new(move |s| s.set_extent(id, old)),
        )
    }

    pub(crate) fn step_create_group(
        &mut self,
        tx: &mut Transaction,
        group: Id,
        children: BTreeSet<Id>,
    ) -> Result<()> {
        self.apply(
            tx,
            Fun::new(move |s| s.create_group_raw(group, &children)),
            Fun::new(move |s| s.remove_group_raw(group).map(|_| ())),
        )
    }

    /// Remove one group node; its children become parentless.
    pub(crate) fn step_remove_group(&mut self, tx: &mut Transaction, group: Id) -> Result<()> {
        let children = self
            .groups
            .children(group)
            .cloned()
            .ok_or_else(|| TimelineError::InvalidGroup(format!("{group} is not a group")))?;
        let parent = self.groups.parent(group);
        self.apply(
            tx,
            Fun::new(move |s| s.remove_group_raw(group).map(|_| ())),
            Fun::new(move |s| {
                s.create_group_raw(group, &children)?;
                if let Some(parent) = parent {
                    s.link_raw(group, parent)?;
                }
                Ok(())
            }),
        )
    }

    fn step_link(&mut self, tx: &mut Transaction, child: Id, parent: Id) -> Result<()> {
        self.apply(
            tx,
            Fun::new(move |s| s.link_raw(child, parent)),
            Fun::new(move |s| s.unlink_raw(child).map(|_| ())),
        )
    }

    /// Take `id` out of its parent group. A parent left with a single
    /// member is dissolved and an empty one removed, walking up the tree.
    pub(crate) fn step_detach_from_group(&mut self, tx: &mut Transaction, id: Id) -> Result<()> {
        let Some(parent) = self.groups.parent(id) else {
            return Ok(());
        };
        self.apply(
            tx,
            Fun::new(move |s| s.unlink_raw(id).map(|_| ())),
            Fun::new(move |s| s.link_raw(id, parent)),
        )?;
        self.step_prune_group(tx, parent)
    }

    fn step_prune_group(&mut self, tx: &mut Transaction, group: Id) -> Result<()> {
        let remaining: Vec<Id> = self
            .groups
            .children(group)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default();
        let grandparent = self.groups.parent(group);
        match remaining.as_slice() {
            [] => {
                self.step_remove_group(tx, group)?;
                match grandparent {
                    Some(g) => self.step_prune_group(tx, g),
                    None => Ok(()),
                }
            }
            [only] => {
                let only = *only;
                self.step_remove_group(tx, group)?;
                match grandparent {
                    Some(g) => self.step_link(tx, only, g),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn step_set_a_track(
        &mut self,
        tx: &mut Transaction,
        id: Id,
        a_track: Option<Id>,
    ) -> Result<()> {
        let old = self.composition(id)?.a_track;
        if old == a_track {
            return Ok(());
        }
        self.apply(
            tx,
            Fun::new(move |s| s.set_a_track_raw(id, a_track)),
            Fun::new(move |s| s.set_a_track_raw(id, old)),
        )
    }

    pub(crate) fn step_set_guide(
        &mut self,
        tx: &mut Transaction,
        position: i64,
        comment: Option<String>,
    ) -> Result<()> {
        let old = self.guides.get(&position).cloned();
        self.apply(
            tx,
            Fun::new(move |s| {
                s.set_guide_raw(position, comment.clone());
                Ok(())
            }),
            Fun::new(move |s| {
                s.set_guide_raw(position, old.clone());
                Ok(())
            }),
        )
    }
}
