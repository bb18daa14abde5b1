//! Integration tests for the timeline facade.
//!
//! Exercises requests, rollback, undo/redo, observers and snapshots across
//! splice-core and splice-timeline.

use splice_core::{Id, TimelineError};
use splice_timeline::{
    ChangedField, Edge, MediaHandle, MediaInfo, MediaResolver, Timeline, TimelineConfig,
    TimelineEvent, TimelineSnapshot, TrackKind, TrimMode,
};
use std::sync::Arc;

use crate::support::{
    assert_no_overlap, media, timeline_with_config, timeline_with_tracks, Recorder,
};

fn snapshot_without_counter(timeline: &Timeline) -> TimelineSnapshot {
    let mut snapshot = timeline.snapshot().unwrap();
    snapshot.next_id = 0;
    snapshot
}

// ── Collisions & rollback ──────────────────────────────────────

#[test]
fn move_into_occupied_range_is_refused() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 5), tracks[0], 10).unwrap();
    let before = timeline.snapshot().unwrap();
    let entries = timeline.history().len();

    let err = timeline.request_item_move(b, tracks[0], 5, false).unwrap_err();
    assert_eq!(err, TimelineError::Collision { conflicting: a });
    assert_eq!(timeline.item_position(b).unwrap(), 10);
    assert_eq!(timeline.snapshot().unwrap(), before);
    assert_eq!(timeline.history().len(), entries);
}

#[test]
fn unknown_id_fails_without_history() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let err = timeline
        .request_item_move(Id::new(999), tracks[0], 0, false)
        .unwrap_err();
    assert_eq!(err, TimelineError::NotFound(Id::new(999)));
    assert!(!timeline.can_undo());
}

#[test]
fn resize_limits() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 5).unwrap();

    assert_eq!(
        timeline.request_item_resize(a, 0, Edge::End, false).unwrap_err(),
        TimelineError::TooSmall { duration: 0 }
    );
    assert!(matches!(
        timeline.request_item_resize(a, 11, Edge::End, false).unwrap_err(),
        TimelineError::Range(_)
    ));
    assert_eq!(timeline.request_item_resize(a, 4, Edge::Start, false).unwrap(), 4);
    assert_eq!(timeline.item_position(a).unwrap(), 11);
    assert_eq!(timeline.store().clip(a).unwrap().in_point, 6);
}

#[test]
fn extreme_positions_are_refused_not_wrapped() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[1], 0).unwrap();
    let c = timeline.request_clip_insertion(media("c", 10), tracks[0], 40).unwrap();
    timeline.request_items_group(&[a, b]).unwrap();
    let before = snapshot_without_counter(&timeline);
    let entries = timeline.history().len();

    let err = timeline
        .request_item_move(c, tracks[0], i64::MAX - 3, false)
        .unwrap_err();
    assert!(matches!(err, TimelineError::Range(_)));
    let err = timeline
        .request_item_move(a, tracks[0], i64::MIN + 2, true)
        .unwrap_err();
    assert!(matches!(err, TimelineError::Range(_)));
    assert!(timeline
        .request_item_trim(c, i64::MAX, Edge::End, TrimMode::Ripple)
        .is_err());
    assert!(timeline
        .request_item_resize(c, i64::MAX, Edge::Start, true)
        .is_err());
    assert!(matches!(
        timeline.request_group_move(a, 0, i64::MAX).unwrap_err(),
        TimelineError::Range(_)
    ));
    assert!(matches!(
        timeline.request_group_move(a, isize::MAX, 0).unwrap_err(),
        TimelineError::Range(_)
    ));

    let suggested = timeline.suggest_item_move(c, tracks[0], i64::MAX, false).unwrap();
    assert!(suggested.checked_add(10).is_some());

    assert_eq!(snapshot_without_counter(&timeline), before);
    assert_eq!(timeline.history().len(), entries);
    timeline.store().verify().unwrap();
}

#[test]
fn resize_snaps_the_moving_edge() {
    let config = TimelineConfig::default().with_snap_distance(4);
    let (mut timeline, tracks) = timeline_with_config(config, 2);
    let a = timeline
        .request_clip_insertion_range(media("a", 40), tracks[0], 0, 0, 20)
        .unwrap();
    let _b = timeline.request_clip_insertion(media("b", 10), tracks[0], 26).unwrap();
    let c = timeline
        .request_clip_insertion_range(media("c", 40), tracks[1], 50, 10, 30)
        .unwrap();
    timeline.request_guide_add(43, "cue").unwrap();

    // End edge: 24 is two frames from `b` at 26.
    assert_eq!(timeline.request_item_resize(a, 24, Edge::End, true).unwrap(), 26);
    assert_eq!(timeline.item_duration(a).unwrap(), 26);

    // Start edge: 70 - 25 = 45 is two frames from the guide at 43.
    assert_eq!(timeline.request_item_resize(c, 25, Edge::Start, true).unwrap(), 27);
    assert_eq!(timeline.item_position(c).unwrap(), 43);
    assert_eq!(timeline.store().clip(c).unwrap().in_point, 3);

    // Without snapping the requested size is kept.
    assert_eq!(timeline.request_item_resize(c, 25, Edge::Start, false).unwrap(), 25);
    assert_eq!(timeline.item_position(c).unwrap(), 45);

    assert_eq!(timeline.undo_label(), Some("Resize item"));
    timeline.undo().unwrap();
    timeline.undo().unwrap();
    timeline.undo().unwrap();
    assert_eq!(timeline.item_position(c).unwrap(), 50);
    assert_eq!(timeline.item_duration(a).unwrap(), 20);
}

// ── Groups ─────────────────────────────────────────────────────

#[test]
fn grouped_move_shifts_all_members_in_one_entry() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[1], 20).unwrap();
    timeline.request_items_group(&[a, b]).unwrap();
    let entries = timeline.history().len();

    assert_eq!(timeline.request_item_move(a, tracks[0], 3, false).unwrap(), 3);
    assert_eq!(timeline.item_position(a).unwrap(), 3);
    assert_eq!(timeline.item_position(b).unwrap(), 23);
    assert_eq!(timeline.history().len(), entries + 1);

    assert_eq!(timeline.undo().unwrap(), "Move item");
    assert_eq!(timeline.item_position(a).unwrap(), 0);
    assert_eq!(timeline.item_position(b).unwrap(), 20);
}

#[test]
fn failed_group_move_moves_nothing() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[1], 0).unwrap();
    let blocker = timeline.request_clip_insertion(media("c", 10), tracks[1], 30).unwrap();
    timeline.request_items_group(&[a, b]).unwrap();

    // `a` would fit at 25 but `b` hits the blocker.
    let err = timeline.request_item_move(a, tracks[0], 25, false).unwrap_err();
    assert_eq!(err, TimelineError::Collision { conflicting: blocker });
    assert_eq!(timeline.item_position(a).unwrap(), 0);
    assert_eq!(timeline.item_position(b).unwrap(), 0);
    assert_no_overlap(&timeline);
}

#[test]
fn nested_groups_ungroup_completely() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[0], 10).unwrap();
    let c = timeline.request_clip_insertion(media("c", 10), tracks[0], 20).unwrap();
    let inner = timeline.request_items_group(&[a, b]).unwrap();
    timeline.request_items_group(&[inner, c]).unwrap();
    assert_eq!(timeline.group_elements(b), [a, b, c].into_iter().collect());

    timeline.request_item_ungroup(b).unwrap();
    assert!(!timeline.is_grouped(a));
    assert!(!timeline.is_grouped(c));
    assert!(timeline.store().groups().is_empty());

    timeline.undo().unwrap();
    assert_eq!(timeline.store().groups().parent(a), Some(inner));
}

#[test]
fn ungrouping_a_loose_item_is_invalid() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    assert!(matches!(
        timeline.request_item_ungroup(a).unwrap_err(),
        TimelineError::InvalidGroup(_)
    ));
    assert_eq!(
        timeline.request_items_group(&[a]).unwrap_err(),
        TimelineError::EmptySet(1)
    );
}

#[test]
fn deleting_grouped_item_deletes_group_and_undo_restores_it() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[1], 0).unwrap();
    let group = timeline.request_items_group(&[a, b]).unwrap();

    timeline.request_item_deletion(a).unwrap();
    assert_eq!(timeline.clips_count(), 0);
    assert!(!timeline.store().is_group(group));

    timeline.undo().unwrap();
    assert_eq!(timeline.clips_count(), 2);
    assert_eq!(timeline.store().groups().parent(b), Some(group));
    timeline.store().verify().unwrap();
}

// ── Tracks ─────────────────────────────────────────────────────

#[test]
fn track_deletion_is_one_entry() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let clips: Vec<Id> = (0..3)
        .map(|i| {
            timeline
                .request_clip_insertion(media("take", 10), tracks[0], i * 10)
                .unwrap()
        })
        .collect();
    let other = timeline.request_clip_insertion(media("b", 10), tracks[1], 0).unwrap();
    timeline.request_items_group(&[clips[0], other]).unwrap();
    let before = timeline.snapshot().unwrap();
    let entries = timeline.history().len();

    timeline.request_track_deletion(tracks[0]).unwrap();
    assert_eq!(timeline.tracks_count(), 1);
    assert_eq!(timeline.clips_count(), 1);
    // The group lost a member and dissolved; `other` survives.
    assert!(!timeline.is_grouped(other));
    assert_eq!(timeline.history().len(), entries + 1);

    timeline.undo().unwrap();
    assert_eq!(timeline.snapshot().unwrap(), before);
    timeline.redo().unwrap();
    assert_eq!(timeline.tracks_count(), 1);
}

#[test]
fn track_insertion_at_ordinal() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let audio = timeline.request_track_insertion(Some(1), TrackKind::Audio).unwrap();
    assert_eq!(timeline.track_ids(), &[tracks[0], audio, tracks[1]]);
    assert_eq!(timeline.track_ordinal(tracks[1]).unwrap(), 2);
    assert!(matches!(
        timeline.request_track_insertion(Some(9), TrackKind::Video).unwrap_err(),
        TimelineError::Range(_)
    ));
}

#[test]
fn reset_is_undoable() {
    let (mut timeline, tracks) = timeline_with_tracks(3);
    for (i, &track) in tracks.iter().enumerate() {
        timeline
            .request_clip_insertion(media("x", 10), track, i as i64 * 5)
            .unwrap();
    }
    let before = timeline.snapshot().unwrap();

    timeline.request_reset().unwrap();
    assert_eq!(timeline.tracks_count(), 0);
    assert_eq!(timeline.duration(), 0);

    timeline.undo().unwrap();
    assert_eq!(timeline.snapshot().unwrap(), before);
}

// ── Snapping & guides ──────────────────────────────────────────

#[test]
fn guides_feed_snapping() {
    let config = TimelineConfig::from_json(br#"{"snap_distance": 5}"#).unwrap();
    let (mut timeline, tracks) = timeline_with_config(config, 1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    timeline.request_guide_add(100, "chorus").unwrap();

    assert_eq!(timeline.request_item_move(a, tracks[0], 97, true).unwrap(), 100);

    timeline.undo().unwrap();
    timeline.undo().unwrap();
    assert!(timeline.guides().is_empty());
    assert_eq!(timeline.request_item_move(a, tracks[0], 97, true).unwrap(), 97);

    timeline.request_guide_add(120, "bridge").unwrap();
    timeline.request_guide_remove(120).unwrap();
    assert!(timeline.guides().is_empty());
    assert!(timeline.request_guide_remove(120).is_err());
    assert_eq!(timeline.undo_label(), Some("Remove guide"));
}

#[test]
fn suggest_move_ignores_own_group() {
    let config = TimelineConfig::default().with_snap_distance(4);
    let (mut timeline, tracks) = timeline_with_config(config, 2);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[1], 40).unwrap();
    let _c = timeline.request_clip_insertion(media("c", 10), tracks[0], 30).unwrap();
    timeline.request_items_group(&[a, b]).unwrap();
    let entries = timeline.history().len();

    // 52 is near `b`'s end at 50, but `b` moves along and must not attract.
    assert_eq!(timeline.suggest_item_move(a, tracks[0], 52, true).unwrap(), 52);
    // 27 snaps to `c` at 30, which is taken; the closest free slot is 20.
    assert_eq!(timeline.suggest_item_move(a, tracks[0], 27, true).unwrap(), 20);
    assert_eq!(timeline.item_position(a).unwrap(), 0);
    assert_eq!(timeline.history().len(), entries);
}

// ── Trims ──────────────────────────────────────────────────────

#[test]
fn ripple_trim_undoes_as_one_entry() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[0], 10).unwrap();
    let c = timeline.request_clip_insertion(media("c", 10), tracks[0], 20).unwrap();

    timeline
        .request_item_trim(a, -5, Edge::End, TrimMode::Ripple)
        .unwrap();
    assert_eq!(timeline.item_position(b).unwrap(), 5);
    assert_eq!(timeline.item_position(c).unwrap(), 15);
    assert_eq!(timeline.duration(), 25);

    assert_eq!(timeline.undo().unwrap(), "Ripple trim");
    assert_eq!(timeline.item_position(c).unwrap(), 20);
    assert_eq!(timeline.item_duration(a).unwrap(), 10);
}

#[test]
fn ripple_trim_at_start_edge_keeps_position() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline
        .request_clip_insertion_range(media("a", 40), tracks[0], 0, 10, 20)
        .unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[0], 10).unwrap();
    let c = timeline.request_clip_insertion(media("c", 5), tracks[0], 25).unwrap();

    // Reveal four more source frames at the head; followers make room.
    timeline
        .request_item_trim(a, 4, Edge::Start, TrimMode::Ripple)
        .unwrap();
    assert_eq!(timeline.item_position(a).unwrap(), 0);
    assert_eq!(timeline.item_duration(a).unwrap(), 14);
    assert_eq!(timeline.store().clip(a).unwrap().in_point, 6);
    assert_eq!(timeline.item_position(b).unwrap(), 14);
    assert_eq!(timeline.item_position(c).unwrap(), 29);
    timeline.undo().unwrap();

    timeline
        .request_item_trim(a, -3, Edge::Start, TrimMode::Ripple)
        .unwrap();
    assert_eq!(timeline.store().clip(a).unwrap().in_point, 13);
    assert_eq!(timeline.item_position(b).unwrap(), 7);
    assert_eq!(timeline.item_position(c).unwrap(), 22);
    assert_no_overlap(&timeline);
}

#[test]
fn roll_at_start_edge_moves_the_cut_both_ways() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline
        .request_clip_insertion_range(media("a", 40), tracks[0], 0, 0, 10)
        .unwrap();
    let b = timeline
        .request_clip_insertion_range(media("b", 40), tracks[0], 10, 10, 20)
        .unwrap();

    timeline.request_item_trim(b, 3, Edge::Start, TrimMode::Roll).unwrap();
    assert_eq!(timeline.item_duration(a).unwrap(), 13);
    assert_eq!(timeline.item_position(b).unwrap(), 13);
    assert_eq!(timeline.store().clip(b).unwrap().in_point, 13);
    assert_eq!(timeline.item_duration(b).unwrap(), 7);
    assert_eq!(timeline.undo().unwrap(), "Roll edit");

    timeline.request_item_trim(b, -4, Edge::Start, TrimMode::Roll).unwrap();
    assert_eq!(timeline.item_duration(a).unwrap(), 6);
    assert_eq!(timeline.item_position(b).unwrap(), 6);
    assert_eq!(timeline.store().clip(b).unwrap().in_point, 6);
    assert_eq!(timeline.duration(), 20);
    assert_no_overlap(&timeline);
}

#[test]
fn roll_without_neighbour_is_refused() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    assert!(matches!(
        timeline.request_item_trim(a, 2, Edge::End, TrimMode::Roll).unwrap_err(),
        TimelineError::Range(_)
    ));
}

// ── Undo / redo ────────────────────────────────────────────────

#[test]
fn redo_tail_is_dropped_by_new_request() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    timeline.request_item_move(a, tracks[0], 20, false).unwrap();
    timeline.undo().unwrap();
    assert!(timeline.can_redo());

    timeline.request_item_move(a, tracks[0], 40, false).unwrap();
    assert!(!timeline.can_redo());
    assert_eq!(timeline.redo().unwrap_err(), TimelineError::NothingToRedo);

    timeline.undo().unwrap();
    timeline.undo().unwrap();
    assert_eq!(timeline.clips_count(), 0);
    assert_eq!(timeline.undo().unwrap_err(), TimelineError::NothingToUndo);
}

#[test]
fn ids_are_never_reused() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    timeline.request_item_deletion(a).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[0], 0).unwrap();
    assert!(b > a);

    timeline.undo().unwrap();
    timeline.undo().unwrap();
    let c = timeline.request_clip_insertion(media("c", 10), tracks[0], 0).unwrap();
    assert!(c > b);
}

// ── Observers ──────────────────────────────────────────────────

#[test]
fn clip_and_composition_move_as_a_group() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let compo = timeline
        .request_composition_insertion("luma", tracks[1], 5, 10, Some(tracks[0]))
        .unwrap();
    timeline.request_items_group(&[a, compo]).unwrap();

    assert_eq!(timeline.request_item_move(compo, tracks[1], 25, false).unwrap(), 25);
    assert_eq!(timeline.item_position(a).unwrap(), 20);
    assert_eq!(timeline.item_position(compo).unwrap(), 25);
    assert_eq!(timeline.item_duration(compo).unwrap(), 10);
    assert_eq!(timeline.store().composition(compo).unwrap().a_track, Some(tracks[0]));

    // The composition would fall off the last track.
    assert!(matches!(
        timeline.request_group_move(a, 1, 0).unwrap_err(),
        TimelineError::Range(_)
    ));

    assert_eq!(timeline.undo().unwrap(), "Move item");
    assert_eq!(timeline.item_position(a).unwrap(), 0);
    assert_eq!(timeline.item_position(compo).unwrap(), 5);
    assert!(timeline.is_grouped(compo));
    assert_eq!(timeline.redo_label(), Some("Move item"));

    timeline.request_composition_a_track(compo, None).unwrap();
    assert_eq!(timeline.store().composition(compo).unwrap().a_track, None);
    assert!(!timeline.can_redo());
}

#[test]
fn group_move_reports_coalesced_change() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let a = timeline.request_clip_insertion(media("a", 10), tracks[0], 0).unwrap();
    let b = timeline.request_clip_insertion(media("b", 10), tracks[0], 10).unwrap();
    timeline.request_items_group(&[a, b]).unwrap();
    let recorder = Arc::new(Recorder::default());
    timeline.subscribe(recorder.clone());

    timeline.request_group_move(a, 0, 5).unwrap();
    let events = recorder.take();
    assert_eq!(events.len(), 1);
    match &events[0] {
        TimelineEvent::ItemsChanged { items, fields } => {
            assert_eq!(items.len(), 2);
            assert!(items.contains(&a) && items.contains(&b));
            assert_eq!(fields.as_slice(), &[ChangedField::Position]);
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert!(timeline.request_group_move(a, 1, 0).is_err());
    assert!(recorder.take().is_empty());
}

// ── Media & persistence ────────────────────────────────────────

struct Catalog;

impl MediaResolver for Catalog {
    fn resolve(&self, handle: &MediaHandle) -> splice_core::Result<MediaInfo> {
        match handle.0.as_str() {
            "missing" => Err(TimelineError::Media("offline".into())),
            "still" => Ok(MediaInfo {
                length: 0,
                stable_id: "/img/still.png".into(),
            }),
            name => Ok(MediaInfo {
                length: 48,
                stable_id: format!("/footage/{name}.mov"),
            }),
        }
    }
}

#[test]
fn media_resolution_happens_first() {
    let (mut timeline, tracks) = timeline_with_tracks(1);
    let issued = timeline.store().ids_issued();

    for handle in ["missing", "still"] {
        let err = timeline
            .request_media_insertion(MediaHandle::new(handle), &Catalog, tracks[0], 0)
            .unwrap_err();
        assert!(matches!(err, TimelineError::Media(_)));
    }
    assert_eq!(timeline.store().ids_issued(), issued);

    let clip = timeline
        .request_media_insertion(MediaHandle::new("beach"), &Catalog, tracks[0], 0)
        .unwrap();
    assert_eq!(timeline.item_duration(clip).unwrap(), 48);
    assert_eq!(timeline.display_name(clip).unwrap(), "beach.mov");
}

#[test]
fn snapshot_roundtrip_through_json() {
    let (mut timeline, tracks) = timeline_with_tracks(2);
    let a = timeline.request_clip_insertion(media("a", 30), tracks[0], 0).unwrap();
    let b = timeline
        .request_clip_insertion_range(media("b", 30), tracks[0], 40, 5, 25)
        .unwrap();
    timeline
        .request_composition_insertion("composite", tracks[1], 0, 30, Some(tracks[0]))
        .unwrap();
    timeline.request_items_group(&[a, b]).unwrap();
    timeline.request_guide_add(60, "end").unwrap();
    timeline.set_track_locked(tracks[1], true).unwrap();
    timeline.set_property(a, "name", "Opening").unwrap();
    timeline.set_property(b, "note", "drop").unwrap();
    timeline.unset_property(b, "note").unwrap();
    assert!(timeline.property(b, "note").is_none());
    assert_eq!(timeline.duration_seconds(), 2.4);

    let json = timeline.snapshot().unwrap().to_json().unwrap();
    let restored = Timeline::from_snapshot(&TimelineSnapshot::from_json(&json).unwrap()).unwrap();

    assert_eq!(
        snapshot_without_counter(&restored),
        snapshot_without_counter(&timeline)
    );
    assert!(restored.store().track(tracks[1]).unwrap().locked);
    assert_eq!(restored.display_name(a).unwrap(), "Opening");
    assert!(!restored.can_undo());
    assert_eq!(restored.store().ids_issued(), timeline.store().ids_issued());
}
