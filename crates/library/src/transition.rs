//! Transition placement model for rough-cut sequences.
//!
//! Only placement is modeled (which effect, where, on which track); rendering
//! the effect is someone else's job. Structural comparison deliberately looks
//! at effect id + start + end and nothing else, so cosmetic attributes do not
//! count as sequence changes.

use std::collections::BTreeMap;

use lc_common::{Rational, TickTime};

/// Which end of the cut the transition hangs off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionAlignment {
    Start,
    End,
    #[default]
    Center,
}

impl TransitionAlignment {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionAlignment::Start => "Start",
            TransitionAlignment::End => "End",
            TransitionAlignment::Center => "Center",
        }
    }

    pub fn from_name(name: &str) -> Option<TransitionAlignment> {
        match name {
            "Start" => Some(TransitionAlignment::Start),
            "End" => Some(TransitionAlignment::End),
            "Center" => Some(TransitionAlignment::Center),
            _ => None,
        }
    }
}

/// Track lane family a transition lives on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }
}

/// One placed transition.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionItem {
    /// Identifier of the transition effect, e.g. `"Cross Dissolve"`.
    pub effect_id: String,
    pub start: TickTime,
    pub end: TickTime,
    /// The edit point the transition straddles.
    pub cut_point: TickTime,
    pub frame_rate: Rational,
    pub alignment: TransitionAlignment,
    pub track_index: u32,
    pub media_kind: MediaKind,
    /// Fraction of the transition before/after the cut, 0..=1.
    pub start_ratio: f32,
    pub end_ratio: f32,
    pub reverse: bool,
}

impl Default for TransitionItem {
    fn default() -> Self {
        Self {
            effect_id: String::new(),
            start: TickTime::ZERO,
            end: TickTime::ZERO,
            cut_point: TickTime::ZERO,
            frame_rate: Rational::FPS_24,
            alignment: TransitionAlignment::default(),
            track_index: 0,
            media_kind: MediaKind::default(),
            start_ratio: 0.0,
            end_ratio: 1.0,
            reverse: false,
        }
    }
}

impl TransitionItem {
    pub fn new(
        effect_id: impl Into<String>,
        track_index: u32,
        start: TickTime,
        end: TickTime,
    ) -> Self {
        Self {
            effect_id: effect_id.into(),
            track_index,
            start,
            end,
            cut_point: start,
            ..Self::default()
        }
    }

    /// Placement-only comparison: effect id, start, end.
    pub fn structural_eq(&self, other: &TransitionItem) -> bool {
        self.effect_id == other.effect_id && self.start == other.start && self.end == other.end
    }
}

/// Transitions grouped by track index, each track ordered by start time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackTransitionMap {
    tracks: BTreeMap<u32, Vec<TransitionItem>>,
}

impl TrackTransitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts under the item's own track index, keeping the track's
    /// start-time order; equal starts keep insertion order.
    pub fn insert(&mut self, item: TransitionItem) {
        let track = self.tracks.entry(item.track_index).or_default();
        let at = track.partition_point(|existing| existing.start <= item.start);
        track.insert(at, item);
    }

    pub fn track(&self, track_index: u32) -> Option<&[TransitionItem]> {
        self.tracks.get(&track_index).map(Vec::as_slice)
    }

    pub fn track_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.tracks.keys().copied()
    }

    /// Every transition with its track index, ascending by track.
    pub fn iter_all(&self) -> impl Iterator<Item = (u32, &TransitionItem)> {
        self.tracks
            .iter()
            .flat_map(|(index, items)| items.iter().map(move |item| (*index, item)))
    }

    /// Total transition count across tracks.
    pub fn len(&self) -> usize {
        self.tracks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    /// Placement-only comparison of whole maps: same populated tracks, same
    /// per-track counts, and positionwise [`TransitionItem::structural_eq`].
    pub fn structural_eq(&self, other: &TrackTransitionMap) -> bool {
        let mine = self.tracks.iter().filter(|(_, items)| !items.is_empty());
        let theirs = other.tracks.iter().filter(|(_, items)| !items.is_empty());
        if mine.clone().count() != theirs.clone().count() {
            return false;
        }
        for ((track_a, items_a), (track_b, items_b)) in mine.zip(theirs) {
            if track_a != track_b || items_a.len() != items_b.len() {
                return false;
            }
            for (a, b) in items_a.iter().zip(items_b.iter()) {
                if !a.structural_eq(b) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dissolve(track: u32, start: i64, end: i64) -> TransitionItem {
        TransitionItem::new(
            "Cross Dissolve",
            track,
            TickTime::from_ticks(start),
            TickTime::from_ticks(end),
        )
    }

    #[test]
    fn insert_keeps_tracks_ordered_by_start() {
        let mut map = TrackTransitionMap::new();
        map.insert(dissolve(0, 50, 60));
        map.insert(dissolve(0, 10, 20));
        map.insert(dissolve(0, 30, 40));

        let starts: Vec<i64> = map
            .track(0)
            .unwrap()
            .iter()
            .map(|t| t.start.ticks())
            .collect();
        assert_eq!(starts, vec![10, 30, 50]);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn equal_starts_keep_insertion_order() {
        let mut map = TrackTransitionMap::new();
        let mut first = dissolve(1, 10, 20);
        first.effect_id = "first".into();
        let mut second = dissolve(1, 10, 20);
        second.effect_id = "second".into();
        map.insert(first);
        map.insert(second);

        let ids: Vec<&str> = map
            .track(1)
            .unwrap()
            .iter()
            .map(|t| t.effect_id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn structural_eq_ignores_cosmetic_attributes() {
        let mut a = TrackTransitionMap::new();
        let mut b = TrackTransitionMap::new();
        a.insert(dissolve(0, 10, 20));
        let mut shifted = dissolve(0, 10, 20);
        shifted.alignment = TransitionAlignment::Start;
        shifted.reverse = true;
        shifted.start_ratio = 0.25;
        b.insert(shifted);

        assert!(a.structural_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn structural_eq_sees_placement_changes() {
        let mut a = TrackTransitionMap::new();
        a.insert(dissolve(0, 10, 20));

        let mut moved = TrackTransitionMap::new();
        moved.insert(dissolve(0, 11, 20));
        assert!(!a.structural_eq(&moved));

        let mut other_track = TrackTransitionMap::new();
        other_track.insert(dissolve(1, 10, 20));
        assert!(!a.structural_eq(&other_track));

        let mut extra = TrackTransitionMap::new();
        extra.insert(dissolve(0, 10, 20));
        extra.insert(dissolve(0, 30, 40));
        assert!(!a.structural_eq(&extra));
    }

    #[test]
    fn iter_all_walks_tracks_in_order() {
        let mut map = TrackTransitionMap::new();
        map.insert(dissolve(2, 5, 6));
        map.insert(dissolve(0, 1, 2));

        let tracks: Vec<u32> = map.iter_all().map(|(track, _)| track).collect();
        assert_eq!(tracks, vec![0, 2]);
    }
}
