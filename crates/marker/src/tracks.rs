//! Marker collections: time-ordered mixed track, per-type views, and
//! ordered template sets.

use lc_common::Guid;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::marker::Marker;

/// Time-ordered multimap of markers.
///
/// Markers sort by start tick; markers sharing a start keep insertion
/// order. Ids are unique within a track; adding an existing id replaces
/// the previous entry.
#[derive(Clone, Debug, Default)]
pub struct MarkerTrack {
    entries: BTreeMap<i64, Vec<Marker>>,
    len: usize,
}

impl MarkerTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, marker: Marker) {
        self.remove(&marker.id().clone());
        self.entries
            .entry(marker.start().ticks())
            .or_default()
            .push(marker);
        self.len += 1;
    }

    pub fn remove(&mut self, id: &Guid) -> Option<Marker> {
        let tick = *self
            .entries
            .iter()
            .find(|(_, markers)| markers.iter().any(|m| m.id() == id))?
            .0;
        let markers = self.entries.get_mut(&tick)?;
        let pos = markers.iter().position(|m| m.id() == id)?;
        let removed = markers.remove(pos);
        if markers.is_empty() {
            self.entries.remove(&tick);
        }
        self.len -= 1;
        Some(removed)
    }

    pub fn find(&self, id: &Guid) -> Option<&Marker> {
        self.iter().find(|m| m.id() == id)
    }

    pub fn contains(&self, id: &Guid) -> bool {
        self.find(id).is_some()
    }

    /// Markers in time order, insertion order within one start tick.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.entries.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}

/// All markers of one clip, viewed two ways at once: a mixed track ordered
/// by time, and one track per marker type.
///
/// The mixed track is the source of truth; the per-type tracks are kept in
/// lock-step on every mutation, so there is no public in-place `&mut
/// Marker` access. Edits go through [`MarkerTracks::modify`], which
/// re-indexes after the closure runs (type and start changes move the
/// marker to the right place in both views).
#[derive(Clone, Debug, Default)]
pub struct MarkerTracks {
    mixed: MarkerTrack,
    by_type: HashMap<String, MarkerTrack>,
    type_order: Vec<String>,
}

impl MarkerTracks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a marker; an existing marker with the same id is replaced
    /// rather than duplicated. Callers are expected to use
    /// [`MarkerTracks::update`] for edits, but the collection stays
    /// consistent either way.
    pub fn add(&mut self, marker: Marker) {
        if self.mixed.contains(marker.id()) {
            debug!(id = %marker.id(), "marker add replaced existing entry");
            let id = marker.id().clone();
            self.remove(&id);
        }
        let type_name = marker.marker_type.clone();
        if !self.by_type.contains_key(&type_name) {
            self.type_order.push(type_name.clone());
        }
        self.by_type
            .entry(type_name)
            .or_default()
            .add(marker.clone());
        self.mixed.add(marker);
    }

    /// Replaces the stored marker carrying this marker's id.
    pub fn update(&mut self, marker: Marker) {
        self.add(marker);
    }

    pub fn remove(&mut self, id: &Guid) -> Option<Marker> {
        let removed = self.mixed.remove(id)?;
        let type_name = removed.marker_type.clone();
        let mut drop_track = false;
        if let Some(track) = self.by_type.get_mut(&type_name) {
            track.remove(id);
            drop_track = track.is_empty();
        }
        if drop_track {
            self.by_type.remove(&type_name);
            self.type_order.retain(|name| *name != type_name);
        }
        Some(removed)
    }

    /// Applies `edit` to the marker with this id, then restores both views'
    /// ordering. Returns false when the id is not present.
    pub fn modify(&mut self, id: &Guid, edit: impl FnOnce(&mut Marker)) -> bool {
        let Some(mut marker) = self.remove(id) else {
            return false;
        };
        edit(&mut marker);
        self.add(marker);
        true
    }

    pub fn find(&self, id: &Guid) -> Option<&Marker> {
        self.mixed.find(id)
    }

    pub fn contains(&self, id: &Guid) -> bool {
        self.mixed.contains(id)
    }

    /// The mixed (all types) time-ordered track.
    pub fn mixed(&self) -> &MarkerTrack {
        &self.mixed
    }

    /// The per-type track, if any marker of that type exists.
    pub fn of_type(&self, type_name: &str) -> Option<&MarkerTrack> {
        self.by_type.get(type_name)
    }

    /// Type names in first-encounter order; drives serialized track order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.type_order.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.mixed.iter()
    }

    pub fn len(&self) -> usize {
        self.mixed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mixed.is_empty()
    }

    pub fn clear(&mut self) {
        self.mixed.clear();
        self.by_type.clear();
        self.type_order.clear();
    }
}

/// Named ordered list of template markers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSet {
    pub name: String,
    markers: Vec<Marker>,
}

impl MarkerSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markers: Vec::new(),
        }
    }

    pub fn with_markers(name: impl Into<String>, markers: Vec<Marker>) -> Self {
        Self {
            name: name.into(),
            markers,
        }
    }

    pub fn push(&mut self, marker: Marker) {
        self.markers.push(marker);
    }

    pub fn remove(&mut self, index: usize) -> Option<Marker> {
        if index < self.markers.len() {
            Some(self.markers.remove(index))
        } else {
            None
        }
    }

    /// Moves the marker at `from` so it lands at `to`, shifting the rest.
    pub fn move_marker(&mut self, from: usize, to: usize) -> bool {
        if from >= self.markers.len() || to >= self.markers.len() {
            return false;
        }
        let marker = self.markers.remove(from);
        self.markers.insert(to, marker);
        true
    }

    pub fn get(&self, index: usize) -> Option<&Marker> {
        self.markers.get(index)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
