//! Presentation metadata attached to entities.
//!
//! Structural fields (position, range, membership) never live here. This is
//! the bag of display name, track height and friends that a view wants to
//! persist next to the model.

use serde::{Deserialize, Serialize};
use splice_core::Id;
use std::collections::{BTreeMap, HashMap};

use crate::events::ChangedField;

/// Display name of a track or item.
pub const NAME: &str = "name";
/// Track lock flag (0/1).
pub const LOCKED: &str = "locked";
/// Track visibility bitmask: bit 1 hidden, bit 2 muted.
pub const HIDE: &str = "hide";
/// Track height in pixels.
pub const HEIGHT: &str = "height";

pub const HIDE_VIDEO: i64 = 1;
pub const HIDE_AUDIO: i64 = 2;

/// A property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Str(String),
}

impl PropertyValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Str(s) => s.parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Fields a view should refresh after `key` changes; empty for keys the
/// model does not recognize.
pub fn fields_for_key(key: &str) -> &'static [ChangedField] {
    match key {
        NAME => &[ChangedField::Name],
        LOCKED => &[ChangedField::Locked],
        HIDE => &[ChangedField::Muted, ChangedField::Hidden],
        HEIGHT => &[ChangedField::Height],
        _ => &[],
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// Per-id property maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    maps: HashMap<Id, PropertyMap>,
}

impl PropertyStore {
    pub fn get(&self, id: Id, key: &str) -> Option<&PropertyValue> {
        self.maps.get(&id)?.get(key)
    }

    /// Set `key`, returning the previous value.
    pub fn set(&mut self, id: Id, key: &str, value: PropertyValue) -> Option<PropertyValue> {
        self.maps.entry(id).or_default().insert(key.to_string(), value)
    }

    pub fn unset(&mut self, id: Id, key: &str) -> Option<PropertyValue> {
        let map = self.maps.get_mut(&id)?;
        let old = map.remove(key);
        if map.is_empty() {
            self.maps.remove(&id);
        }
        old
    }

    pub fn map(&self, id: Id) -> Option<&PropertyMap> {
        self.maps.get(&id)
    }

    /// Drop every property of `id`, returning them.
    pub fn take(&mut self, id: Id) -> PropertyMap {
        self.maps.remove(&id).unwrap_or_default()
    }

    /// Restore a map previously returned by [`take`](Self::take).
    pub fn restore(&mut self, id: Id, map: PropertyMap) {
        if !map.is_empty() {
            self.maps.insert(id, map);
        }
    }

    /// All maps, sorted by id.
    pub fn sorted(&self) -> BTreeMap<Id, PropertyMap> {
        self.maps.iter().map(|(id, m)| (*id, m.clone())).collect()
    }
}
