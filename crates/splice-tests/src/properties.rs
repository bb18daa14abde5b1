//! Property tests over random request sequences.

use proptest::prelude::*;
use splice_core::Id;
use splice_timeline::{Edge, Timeline, TimelineSnapshot, TrimMode};
use std::collections::BTreeSet;

use crate::support::{assert_no_overlap, media, timeline_with_tracks};

const TRACKS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Insert { track: usize, position: i64, len: i64 },
    Move { pick: usize, track: usize, position: i64, snap: bool },
    Resize { pick: usize, size: i64, start: bool },
    Trim { pick: usize, delta: i64, mode: usize, start: bool },
    Delete { pick: usize },
    Group { a: usize, b: usize },
    Ungroup { pick: usize },
    DeleteTrack { track: usize },
    Undo,
    Redo,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..TRACKS, 0i64..200, 1i64..40)
            .prop_map(|(track, position, len)| Op::Insert { track, position, len }),
        3 => (any::<usize>(), 0..TRACKS, -5i64..200, any::<bool>())
            .prop_map(|(pick, track, position, snap)| Op::Move { pick, track, position, snap }),
        1 => (any::<usize>(), -2i64..45, any::<bool>())
            .prop_map(|(pick, size, start)| Op::Resize { pick, size, start }),
        2 => (any::<usize>(), -10i64..10, 0usize..4, any::<bool>())
            .prop_map(|(pick, delta, mode, start)| Op::Trim { pick, delta, mode, start }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Group { a, b }),
        1 => any::<usize>().prop_map(|pick| Op::Ungroup { pick }),
        1 => (0..TRACKS).prop_map(|track| Op::DeleteTrack { track }),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn nth_clip(timeline: &Timeline, pick: usize) -> Option<Id> {
    let clips = timeline.store().clip_ids();
    if clips.is_empty() {
        None
    } else {
        Some(clips[pick % clips.len()])
    }
}

fn nth_track(timeline: &Timeline, index: usize) -> Option<Id> {
    let tracks = timeline.track_ids();
    if tracks.is_empty() {
        None
    } else {
        Some(tracks[index % tracks.len()])
    }
}

/// Apply `op`; `None` when there was nothing to apply it to.
fn apply(timeline: &mut Timeline, op: &Op) -> Option<bool> {
    let ok = match *op {
        Op::Insert { track, position, len } => {
            let track = nth_track(timeline, track)?;
            timeline
                .request_clip_insertion(media("p", len), track, position)
                .is_ok()
        }
        Op::Move { pick, track, position, snap } => {
            let id = nth_clip(timeline, pick)?;
            let track = nth_track(timeline, track)?;
            timeline.request_item_move(id, track, position, snap).is_ok()
        }
        Op::Resize { pick, size, start } => {
            let id = nth_clip(timeline, pick)?;
            let edge = if start { Edge::Start } else { Edge::End };
            timeline.request_item_resize(id, size, edge, false).is_ok()
        }
        Op::Trim { pick, delta, mode, start } => {
            let id = nth_clip(timeline, pick)?;
            let mode = [TrimMode::Resize, TrimMode::Ripple, TrimMode::Roll, TrimMode::Slip][mode];
            let edge = if start { Edge::Start } else { Edge::End };
            timeline.request_item_trim(id, delta, edge, mode).is_ok()
        }
        Op::Delete { pick } => {
            let id = nth_clip(timeline, pick)?;
            timeline.request_item_deletion(id).is_ok()
        }
        Op::Group { a, b } => {
            let (a, b) = (nth_clip(timeline, a)?, nth_clip(timeline, b)?);
            timeline.request_items_group(&[a, b]).is_ok()
        }
        Op::Ungroup { pick } => {
            let id = nth_clip(timeline, pick)?;
            timeline.request_item_ungroup(id).is_ok()
        }
        Op::DeleteTrack { track } => {
            let track = nth_track(timeline, track)?;
            timeline.request_track_deletion(track).is_ok()
        }
        Op::Undo => timeline.undo().is_ok(),
        Op::Redo => timeline.redo().is_ok(),
    };
    Some(ok)
}

fn state(timeline: &Timeline) -> TimelineSnapshot {
    let mut snapshot = timeline.snapshot().unwrap();
    snapshot.next_id = 0;
    snapshot
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn requests_keep_tracks_disjoint(ops in prop::collection::vec(op(), 1..40)) {
        let (mut timeline, _) = timeline_with_tracks(TRACKS);
        for op in &ops {
            apply(&mut timeline, op);
            assert_no_overlap(&timeline);
            prop_assert!(timeline.store().verify().is_ok());
        }
    }

    #[test]
    fn failed_requests_change_nothing(ops in prop::collection::vec(op(), 1..40)) {
        let (mut timeline, _) = timeline_with_tracks(TRACKS);
        for op in &ops {
            let before = state(&timeline);
            let entries = timeline.history().len();
            let cursor = timeline.history().cursor();
            if apply(&mut timeline, op) == Some(false) {
                prop_assert_eq!(state(&timeline), before);
                prop_assert_eq!(timeline.history().len(), entries);
                prop_assert_eq!(timeline.history().cursor(), cursor);
            }
        }
    }

    #[test]
    fn undo_all_then_redo_all_round_trips(ops in prop::collection::vec(op(), 1..30)) {
        let (mut timeline, _) = timeline_with_tracks(TRACKS);
        let initial = state(&timeline);
        for op in &ops {
            apply(&mut timeline, op);
        }
        let edited = state(&timeline);
        let depth = timeline.history().cursor();

        for _ in 0..depth {
            prop_assert!(timeline.undo().is_ok());
        }
        prop_assert_eq!(state(&timeline), initial);

        for _ in 0..depth {
            prop_assert!(timeline.redo().is_ok());
        }
        prop_assert_eq!(state(&timeline), edited);
    }

    #[test]
    fn ids_stay_unique(ops in prop::collection::vec(op(), 1..40)) {
        let (mut timeline, _) = timeline_with_tracks(TRACKS);
        let mut seen = BTreeSet::new();
        for op in &ops {
            let before: BTreeSet<Id> = timeline.store().clip_ids().into_iter().collect();
            let issued = timeline.store().ids_issued();
            apply(&mut timeline, op);
            prop_assert!(timeline.store().ids_issued() >= issued);
            for id in timeline.store().clip_ids() {
                if !before.contains(&id) {
                    // Either undo/redo brought an old clip back, or the id is fresh.
                    prop_assert!(seen.contains(&id) || id.raw() >= issued, "id {} reused", id);
                }
            }
            seen.extend(timeline.store().clip_ids());
        }
    }

    #[test]
    fn group_members_move_rigidly(
        dt in -1isize..=1,
        dp in -30i64..30,
        gap in 0i64..20,
    ) {
        let (mut timeline, tracks) = timeline_with_tracks(TRACKS);
        let a = timeline.request_clip_insertion(media("a", 10), tracks[1], 20).unwrap();
        let b = timeline.request_clip_insertion(media("b", 10), tracks[2], 30 + gap).unwrap();
        let _c = timeline.request_clip_insertion(media("c", 10), tracks[0], 35).unwrap();
        timeline.request_items_group(&[a, b]).unwrap();

        let offset = |t: &Timeline| {
            let pos = t.item_position(b).unwrap() - t.item_position(a).unwrap();
            let ord = |id| {
                t.track_ordinal(t.item_track_id(id).unwrap().unwrap()).unwrap() as isize
            };
            (pos, ord(b) - ord(a))
        };
        let before = offset(&timeline);
        let start = timeline.item_position(a).unwrap();

        match timeline.request_group_move(a, dt, dp) {
            Ok(()) => prop_assert_eq!(timeline.item_position(a).unwrap(), start + dp),
            Err(_) => prop_assert_eq!(timeline.item_position(a).unwrap(), start),
        }
        prop_assert_eq!(offset(&timeline), before);
        assert_no_overlap(&timeline);
    }
}
