//! Track types for the timeline.

use serde::{Deserialize, Serialize};
use splice_core::{FrameRange, Id, Result, TimelineError};
use std::collections::{BTreeMap, HashMap};

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
}

/// An item placed on a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub id: Id,
    pub range: FrameRange,
}

/// A track: an ordered lane of non-overlapping placements.
///
/// Clips and compositions share the lane. The track only knows ids and
/// ranges; the entities themselves live in the timeline store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Unique track ID
    pub id: Id,
    /// Track kind
    pub kind: TrackKind,
    /// Is track muted
    pub muted: bool,
    /// Is track locked
    pub locked: bool,
    /// Is track hidden
    pub hidden: bool,
    /// Placements keyed by start frame
    placements: BTreeMap<i64, Placement>,
    /// Start frame of every placed id
    starts: HashMap<Id, i64>,
}

impl Track {
    /// Create an empty track.
    pub fn new(id: Id, kind: TrackKind) -> Self {
        Self {
            id,
            kind,
            muted: false,
            locked: false,
            hidden: false,
            placements: BTreeMap::new(),
            starts: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of placed items.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.starts.contains_key(&id)
    }

    /// Range occupied by `id` on this track.
    pub fn range_of(&self, id: Id) -> Option<FrameRange> {
        let start = self.starts.get(&id)?;
        self.placements.get(start).map(|p| p.range)
    }

    /// First item that would overlap `range`, ignoring `ignore`.
    ///
    /// Placements never overlap each other, so only the last placement
    /// starting before `range.end()` can reach into `range`.
    pub fn conflict(&self, range: FrameRange, ignore: Option<Id>) -> Option<Id> {
        self.placements
            .range(..range.end())
            .rev()
            .map(|(_, p)| p)
            .find(|p| Some(p.id) != ignore)
            .filter(|p| p.range.overlaps(range))
            .map(|p| p.id)
    }

    /// Place `id` over `range`. Fails without mutating on overlap.
    pub fn place(&mut self, id: Id, range: FrameRange) -> Result<()> {
        if let Some(conflicting) = self.conflict(range, Some(id)) {
            return Err(TimelineError::Collision { conflicting });
        }
        if self.starts.contains_key(&id) {
            return Err(TimelineError::Range(format!(
                "item {id} is already placed on track {}",
                self.id
            )));
        }
        self.placements.insert(range.start, Placement { id, range });
        self.starts.insert(id, range.start);
        Ok(())
    }

    /// Remove `id` from the track, returning the range it occupied.
    pub fn unplace(&mut self, id: Id) -> Option<FrameRange> {
        let start = self.starts.remove(&id)?;
        self.placements.remove(&start).map(|p| p.range)
    }

    /// Item covering `frame`, if any.
    pub fn item_at(&self, frame: i64) -> Option<Id> {
        self.placements
            .range(..=frame)
            .next_back()
            .filter(|(_, p)| p.range.contains(frame))
            .map(|(_, p)| p.id)
    }

    /// Item ids ordered by id. This is the enumeration order handed to
    /// presentation layers; it says nothing about timeline position.
    pub fn items_by_id(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.starts.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Placements in timeline order.
    pub fn placements(&self) -> impl DoubleEndedIterator<Item = &Placement> {
        self.placements.values()
    }

    /// Placements starting at or after `frame`, in timeline order.
    pub fn placements_from(&self, frame: i64) -> impl DoubleEndedIterator<Item = &Placement> {
        self.placements.range(frame..).map(|(_, p)| p)
    }

    /// Placement whose range ends exactly where `id` starts.
    pub fn adjacent_before(&self, id: Id) -> Option<Placement> {
        let start = *self.starts.get(&id)?;
        self.placements
            .range(..start)
            .next_back()
            .map(|(_, p)| *p)
            .filter(|p| p.range.end() == start)
    }

    /// Placement starting exactly where `id` ends.
    pub fn adjacent_after(&self, id: Id) -> Option<Placement> {
        let range = self.range_of(id)?;
        self.placements.get(&range.end()).copied()
    }

    /// End of the last placement.
    pub fn duration(&self) -> i64 {
        self.placements
            .values()
            .next_back()
            .map(|p| p.range.end())
            .unwrap_or(0)
    }

    /// Start closest to `desired` where `duration` frames fit without
    /// overlapping anything but `ignore`. Ties go to the earlier position.
    pub fn nearest_free_start(&self, desired: i64, duration: i64, ignore: Option<Id>) -> i64 {
        let desired = desired.max(0);
        let mut best: Option<i64> = None;
        let mut consider = |candidate: i64| {
            let better = match best {
                None => true,
                Some(b) => {
                    let (dc, db) = ((candidate - desired).abs(), (b - desired).abs());
                    dc < db || (dc == db && candidate < b)
                }
            };
            if better {
                best = Some(candidate);
            }
        };

        let mut gap_start = 0;
        for p in self.placements.values().filter(|p| Some(p.id) != ignore) {
            if p.range.start - gap_start >= duration {
                consider(desired.clamp(gap_start, p.range.start - duration));
            }
            gap_start = gap_start.max(p.range.end());
        }
        // The tail is unbounded, so there is always a candidate.
        consider(desired.max(gap_start));
        best.unwrap_or(gap_start)
    }
}
