//! Timeline snapshots with versioning.
//!
//! A snapshot is a plain-data copy of the entity graph, serialized as JSON
//! with a schema version field. Loading rebuilds the store through the same
//! validating primitives edits use, so a corrupt snapshot is rejected rather
//! than producing overlapping items or a cyclic group.

use serde::{Deserialize, Serialize};
use splice_core::{Id, Result, TimelineError};
use std::collections::BTreeSet;

use crate::clip::Clip;
use crate::composition::Composition;
use crate::config::TimelineConfig;
use crate::properties::PropertyMap;
use crate::store::{Extent, Item, TimelineStore};
use crate::track::{Track, TrackKind};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub id: Id,
    pub kind: TrackKind,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: Id,
    pub children: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuideRecord {
    pub position: i64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: Id,
    pub values: PropertyMap,
}

/// Versioned copy of a whole timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    /// Schema version for migration.
    pub version: u32,
    #[serde(default)]
    pub config: TimelineConfig,
    /// Value of the id counter; ids below it are never reissued.
    pub next_id: u64,
    /// Tracks in ordinal order.
    pub tracks: Vec<TrackRecord>,
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub compositions: Vec<Composition>,
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub guides: Vec<GuideRecord>,
    #[serde(default)]
    pub properties: Vec<PropertyRecord>,
}

impl TimelineSnapshot {
    /// Copy the state of `store`.
    pub fn capture(store: &TimelineStore) -> Result<Self> {
        let tracks = store
            .track_ids()
            .iter()
            .map(|&id| {
                let track = store.track(id)?;
                Ok(TrackRecord {
                    id,
                    kind: track.kind,
                    muted: track.muted,
                    locked: track.locked,
                    hidden: track.hidden,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let clips = store
            .clip_ids()
            .into_iter()
            .map(|id| store.clip(id).cloned())
            .collect::<Result<Vec<_>>>()?;
        let compositions = store
            .composition_ids()
            .into_iter()
            .map(|id| store.composition(id).cloned())
            .collect::<Result<Vec<_>>>()?;
        let groups = store
            .groups()
            .group_ids()
            .into_iter()
            .map(|id| GroupRecord {
                id,
                children: store
                    .groups()
                    .children(id)
                    .map(|c| c.iter().copied().collect())
                    .unwrap_or_default(),
            })
            .collect();
        let guides = store
            .guides()
            .iter()
            .map(|(&position, comment)| GuideRecord {
                position,
                comment: comment.clone(),
            })
            .collect();
        let properties = store
            .properties()
            .sorted()
            .into_iter()
            .map(|(id, values)| PropertyRecord { id, values })
            .collect();

        Ok(Self {
            version: CURRENT_VERSION,
            config: store.config().clone(),
            next_id: store.ids_issued(),
            tracks,
            clips,
            compositions,
            groups,
            guides,
            properties,
        })
    }

    /// Rebuild a store, validating every placement and group link.
    pub fn restore(&self) -> Result<TimelineStore> {
        self.config.validate()?;
        let mut store = TimelineStore::new(self.config.clone());

        for (ordinal, record) in self.tracks.iter().enumerate() {
            let mut track = Track::new(record.id, record.kind);
            track.muted = record.muted;
            track.locked = record.locked;
            track.hidden = record.hidden;
            store.insert_track_raw(track, ordinal)?;
        }

        let items = self
            .clips
            .iter()
            .cloned()
            .map(Item::Clip)
            .chain(self.compositions.iter().cloned().map(Item::Composition));
        for item in items {
            let id = item.id();
            let (extent, a_track, unplaced) = match item {
                Item::Clip(clip) => {
                    let extent = Extent {
                        track: clip.track,
                        position: clip.position,
                        in_point: clip.in_point,
                        out_point: clip.out_point,
                    };
                    let unplaced = Clip { track: None, ..clip };
                    (extent, None, Item::Clip(unplaced))
                }
                Item::Composition(compo) => {
                    let extent = Extent {
                        track: compo.track,
                        position: compo.position,
                        in_point: 0,
                        out_point: compo.duration,
                    };
                    let a_track = compo.a_track;
                    let unplaced = Composition {
                        track: None,
                        a_track: None,
                        ..compo
                    };
                    (extent, a_track, Item::Composition(unplaced))
                }
            };
            store.insert_item_raw(unplaced)?;
            store.set_extent(id, extent)?;
            if a_track.is_some() {
                store.set_a_track_raw(id, a_track)?;
            }
        }

        if let Some(record) = self
            .groups
            .iter()
            .find(|g| g.children.iter().collect::<BTreeSet<_>>().len() < 2)
        {
            return Err(TimelineError::InvalidGroup(format!(
                "group {} needs at least two members, has {:?}",
                record.id, record.children
            )));
        }

        // Children must exist before the group adopting them.
        let mut pending: Vec<&GroupRecord> = self.groups.iter().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut waiting = Vec::new();
            for record in pending {
                let ready = record
                    .children
                    .iter()
                    .all(|c| store.is_item(*c) || store.is_group(*c));
                if ready {
                    let children: BTreeSet<Id> = record.children.iter().copied().collect();
                    store.create_group_raw(record.id, &children)?;
                } else {
                    waiting.push(record);
                }
            }
            if waiting.len() == before {
                return Err(TimelineError::InvalidGroup(format!(
                    "groups {:?} reference missing or cyclic members",
                    waiting.iter().map(|g| g.id).collect::<Vec<_>>()
                )));
            }
            pending = waiting;
        }

        for guide in &self.guides {
            store.set_guide_raw(guide.position, Some(guide.comment.clone()));
        }
        for record in &self.properties {
            for (key, value) in &record.values {
                store.set_property_raw(record.id, key, Some(value.clone()))?;
            }
        }

        store.reserve_all_ids();
        if let Some(last) = self.next_id.checked_sub(1) {
            store.reserve_id(Id::new(last));
        }
        store.discard_events();
        store.verify()?;
        Ok(store)
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| {
            TimelineError::Serialization(format!("Failed to serialize timeline: {}", e))
        })
    }

    /// Deserialize from JSON bytes, rejecting newer schema versions.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| TimelineError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| TimelineError::Serialization("Missing schema version".into()))?;

        if version > u64::from(CURRENT_VERSION) {
            return Err(TimelineError::Serialization(format!(
                "Timeline version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        serde_json::from_value(raw)
            .map_err(|e| TimelineError::Serialization(format!("Failed to parse timeline: {}", e)))
    }
}
