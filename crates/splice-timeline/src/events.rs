//! Change notifications for presentation layers.
//!
//! The store records events while it mutates. They are held back until a
//! request commits (or an undo/redo finishes) and then handed to every
//! observer in order; a rolled-back request drops them.

use smallvec::SmallVec;
use splice_core::Id;

/// Semantic field touched by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangedField {
    Position,
    Duration,
    /// Source in/out moved without changing the timeline range (slip).
    SourceWindow,
    Membership,
    Name,
    Locked,
    Muted,
    Hidden,
    Height,
    ATrack,
}

pub type ChangedFields = SmallVec<[ChangedField; 4]>;

/// One change to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    TrackInserted { track: Id, ordinal: usize },
    TrackRemoved { track: Id },
    TrackChanged { track: Id, fields: ChangedFields },
    ItemInserted { track: Id, item: Id },
    ItemRemoved { track: Id, item: Id },
    /// Items whose listed fields changed.
    ItemsChanged { items: SmallVec<[Id; 4]>, fields: ChangedFields },
    GuidesChanged,
}

impl TimelineEvent {
    pub fn item_changed(item: Id, fields: &[ChangedField]) -> Self {
        Self::ItemsChanged {
            items: SmallVec::from_slice(&[item]),
            fields: SmallVec::from_slice(fields),
        }
    }

    pub fn track_changed(track: Id, fields: &[ChangedField]) -> Self {
        Self::TrackChanged {
            track,
            fields: SmallVec::from_slice(fields),
        }
    }
}

/// Receives committed changes. Called synchronously, in order.
pub trait TimelineObserver: Send + Sync {
    fn on_event(&self, event: &TimelineEvent);
}

impl<F> TimelineObserver for F
where
    F: Fn(&TimelineEvent) + Send + Sync,
{
    fn on_event(&self, event: &TimelineEvent) {
        self(event)
    }
}

/// Merge consecutive `ItemsChanged` events that carry the same fields,
/// so one group move reports one id range instead of one event per member.
pub fn coalesce(events: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
    let mut out: Vec<TimelineEvent> = Vec::with_capacity(events.len());
    for event in events {
        if let (
            Some(TimelineEvent::ItemsChanged { items, fields }),
            TimelineEvent::ItemsChanged {
                items: new_items,
                fields: new_fields,
            },
        ) = (out.last_mut(), &event)
        {
            if *fields == *new_fields {
                for id in new_items {
                    if !items.contains(id) {
                        items.push(*id);
                    }
                }
                continue;
            }
        }
        if out.last() == Some(&event) {
            continue;
        }
        out.push(event);
    }
    out
}
