//! Structural change detection between a rough cut and its live sequence.

use tracing::debug;

use crate::host::SequenceView;
use crate::model::{RcClipItem, RoughCut};

/// Compares stored clip items against the sequence: item count first, then
/// positional in/duration pairs, then freshly rebuilt transition maps.
/// O(tracks x items), nothing mutated on either side.
pub(crate) fn is_structurally_changed(cut: &RoughCut, view: &dyn SequenceView) -> bool {
    let live_items = view.track_items();
    if live_items.len() != cut.clip_items.len() {
        return true;
    }
    for (clip, live) in cut.clip_items.iter().zip(live_items.iter()) {
        let stored_in = clip.asset.effective_in_point();
        let stored_duration = clip.asset.effective_out_point() - stored_in;
        if live.in_point != stored_in || live.duration != stored_duration {
            return true;
        }
    }
    if !view
        .video_transitions()
        .structural_eq(&cut.asset.video_transitions)
    {
        return true;
    }
    if !view
        .audio_transitions()
        .structural_eq(&cut.asset.audio_transitions)
    {
        return true;
    }
    false
}

/// Rebuilds the clip-item list to mirror the sequence. Items are matched by
/// track-item identity and re-trimmed; stored items the sequence no longer
/// has are parked in the trash list so an undo can restore them. Transition
/// maps are replaced by the rebuilt ones.
pub(crate) fn resync_from_sequence(cut: &mut RoughCut, view: &dyn SequenceView) {
    let mut pool: Vec<RcClipItem> = Vec::with_capacity(cut.clip_items.len() + cut.trash.len());
    pool.append(&mut cut.clip_items);
    pool.append(&mut cut.trash);

    let mut matched: Vec<RcClipItem> = Vec::new();
    for live in view.track_items() {
        let found = pool.iter().position(|c| c.track_item == Some(live.id));
        let Some(index) = found else {
            continue;
        };
        let mut item = pool.swap_remove(index);
        item.asset.in_point = live.in_point;
        item.asset.out_point = live.in_point + live.duration;
        item.asset.custom_in = None;
        item.asset.custom_out = None;
        matched.push(item);
    }

    let parked = pool.len();
    cut.clip_items = matched;
    cut.trash = pool;
    cut.asset.video_transitions = view.video_transitions();
    cut.asset.audio_transitions = view.audio_transitions();
    cut.mark_dirty();
    debug!(cut = %cut.asset.name, items = cut.clip_items.len(), parked, "resynced from sequence");
}

#[cfg(test)]
mod tests {
    use lc_common::TickTime;
    use lc_library::{AssetItem, TransitionItem};

    use crate::host::{TrackItemId, TrackItemInfo};
    use crate::model::{RoughCutHandle, SaveState};
    use crate::testutil::FakeSequence;

    fn ticks(t: i64) -> TickTime {
        TickTime::from_ticks(t)
    }

    fn clip(name: &str, in_point: i64, out_point: i64) -> AssetItem {
        let mut item = AssetItem::master_clip(name, format!("d:/media/{name}.mov"));
        item.in_point = ticks(in_point);
        item.out_point = ticks(out_point);
        item
    }

    /// Rough cut with two clips realized as sequence items 1 and 2.
    fn attached_cut() -> RoughCutHandle {
        let cut = RoughCutHandle::new("Selects", "d:/cuts/selects.rcut");
        cut.add_clip(clip("a", 0, 10)).unwrap();
        cut.add_clip(clip("b", 5, 20)).unwrap();
        {
            let mut inner = cut.lock();
            inner.clip_items[0].track_item = Some(TrackItemId(1));
            inner.clip_items[1].track_item = Some(TrackItemId(2));
            inner.state = SaveState::Clean;
        }
        cut
    }

    fn matching_view() -> FakeSequence {
        FakeSequence::new(vec![
            TrackItemInfo {
                id: TrackItemId(1),
                in_point: ticks(0),
                duration: ticks(10),
            },
            TrackItemInfo {
                id: TrackItemId(2),
                in_point: ticks(5),
                duration: ticks(15),
            },
        ])
    }

    #[test]
    fn unchanged_sequence_is_not_a_change() {
        let cut = attached_cut();
        assert!(!cut.test_if_changed(&matching_view()));
    }

    #[test]
    fn trim_is_detected() {
        let cut = attached_cut();
        let mut view = matching_view();
        view.items[1].in_point = ticks(6);
        assert!(cut.test_if_changed(&view));
    }

    #[test]
    fn item_count_mismatch_is_detected() {
        let cut = attached_cut();
        let mut view = matching_view();
        view.items.pop();
        assert!(cut.test_if_changed(&view));
    }

    #[test]
    fn transition_placement_change_is_detected() {
        let cut = attached_cut();
        let mut view = matching_view();
        view.video
            .insert(TransitionItem::new("Cross Dissolve", 0, ticks(8), ticks(12)));
        assert!(cut.test_if_changed(&view));

        // Matching the stored map makes the change disappear.
        cut.lock().asset.video_transitions = view.video.clone();
        assert!(!cut.test_if_changed(&view));
    }

    #[test]
    fn resync_trims_parks_and_marks_dirty() {
        let cut = attached_cut();
        let mut view = matching_view();
        // Item 2 was retrimmed, item 1 deleted from the sequence.
        view.items.remove(0);
        view.items[0].in_point = ticks(7);
        view.items[0].duration = ticks(9);
        view.video
            .insert(TransitionItem::new("Dip to Black", 0, ticks(7), ticks(8)));

        cut.reset_clip_items_from_sequence(&view);

        assert_eq!(cut.clip_count(), 1);
        assert_eq!(cut.trash_count(), 1);
        let synced = &cut.clip_assets()[0];
        assert_eq!(synced.name, "b");
        assert_eq!(synced.in_point, ticks(7));
        assert_eq!(synced.out_point, ticks(16));
        assert!(cut.is_dirty());
        assert!(cut.asset().video_transitions.structural_eq(&view.video));
        assert!(!cut.test_if_changed(&view));
    }

    #[test]
    fn resync_restores_parked_items_when_they_return() {
        let cut = attached_cut();
        let mut shrunk = matching_view();
        shrunk.items.remove(0);
        cut.reset_clip_items_from_sequence(&shrunk);
        assert_eq!(cut.trash_count(), 1);

        // An undo in the host brings item 1 back.
        cut.reset_clip_items_from_sequence(&matching_view());
        assert_eq!(cut.clip_count(), 2);
        assert_eq!(cut.trash_count(), 0);
        let names: Vec<String> = cut.clip_assets().iter().map(|a| a.name.clone()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
