//! Marker record and tag model.
//!
//! A `Marker` is the atomic annotation unit: a time range on a clip plus
//! typed text fields, cue-point key/values, and an ordered tag list. The
//! shape matches the temporal-metadata schema the XMP codec reads and
//! writes, so field semantics here are interchange contracts.

use lc_common::{Guid, MarkerColor, TickTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use crate::error::{MarkerError, MarkerResult};

/// One cue-point key/value pair. Order within a marker is meaningful.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuePoint {
    pub key: String,
    pub value: String,
}

impl CuePoint {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A keyword/label attached to a marker.
///
/// Every attachment of a tag is a distinct instance with its own id; the
/// id survives plain copies and changes only on an explicit
/// [`TagParam::duplicate_unique`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagParam {
    instance_id: Guid,
    /// Display name shown in tag chips and exports.
    pub name: String,
    /// Free-text payload carried alongside the name.
    pub payload: String,
    /// Chip color, packed ARGB in serialized form.
    pub color: MarkerColor,
}

impl TagParam {
    pub fn new(name: impl Into<String>, payload: impl Into<String>, color: MarkerColor) -> Self {
        Self {
            instance_id: Guid::generate(),
            name: name.into(),
            payload: payload.into(),
            color,
        }
    }

    /// Rebuilds a tag read back from serialized metadata, keeping its
    /// foreign instance id.
    pub fn with_id(
        instance_id: Guid,
        name: impl Into<String>,
        payload: impl Into<String>,
        color: MarkerColor,
    ) -> Self {
        Self {
            instance_id,
            name: name.into(),
            payload: payload.into(),
            color,
        }
    }

    pub fn instance_id(&self) -> &Guid {
        &self.instance_id
    }

    /// Copy with a fresh instance id; name, payload, and color carry over.
    pub fn duplicate_unique(&self) -> Self {
        Self {
            instance_id: Guid::generate(),
            name: self.name.clone(),
            payload: self.payload.clone(),
            color: self.color,
        }
    }
}

/// Reverse-lookup handle from a marker to the clip it is attached to.
///
/// Implemented by the owning clip objects; held weakly by markers so a
/// marker can never keep its owner alive.
pub trait MarkerOwner: Send + Sync {
    /// Stable id of the owning clip/asset.
    fn owner_id(&self) -> Guid;
    /// Media path of the owning clip, for display and grouping.
    fn owner_media_path(&self) -> String;
}

/// A time-ranged annotation attached to a clip.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    id: Guid,
    start: TickTime,
    duration: TickTime,
    /// Marker type name; unregistered names are auto-registered on decode,
    /// never rejected.
    pub marker_type: String,
    pub name: String,
    pub comment: String,
    pub location: String,
    pub target: String,
    /// Cue-point schema selector; the key/value list below is
    /// schema-specific to this value.
    pub cue_point_type: String,
    pub cue_points: Vec<CuePoint>,
    pub speaker: String,
    pub probability: String,
    tags: BTreeMap<u32, TagParam>,
    #[serde(skip)]
    owner: Option<Weak<dyn MarkerOwner>>,
}

impl Marker {
    /// New empty marker of the given type with a fresh id at time zero.
    pub fn new(marker_type: impl Into<String>) -> Self {
        Self {
            id: Guid::generate(),
            marker_type: marker_type.into(),
            ..Self::default()
        }
    }

    /// Rebuilds a marker read back from serialized metadata under its
    /// original id.
    pub fn with_id(id: Guid, marker_type: impl Into<String>) -> Self {
        Self {
            id,
            marker_type: marker_type.into(),
            ..Self::default()
        }
    }

    pub fn id(&self) -> &Guid {
        &self.id
    }

    pub fn start(&self) -> TickTime {
        self.start
    }

    pub fn duration(&self) -> TickTime {
        self.duration
    }

    pub fn end(&self) -> TickTime {
        self.start + self.duration
    }

    /// Start times never go negative; the id and relative tag order are
    /// unaffected by time edits.
    pub fn set_start(&mut self, start: TickTime) -> MarkerResult<()> {
        if start.is_negative() {
            return Err(MarkerError::NegativeTime {
                ticks: start.ticks(),
            });
        }
        self.start = start;
        Ok(())
    }

    /// Durations may be zero (point markers) but never negative.
    pub fn set_duration(&mut self, duration: TickTime) -> MarkerResult<()> {
        if duration.is_negative() {
            return Err(MarkerError::NegativeTime {
                ticks: duration.ticks(),
            });
        }
        self.duration = duration;
        Ok(())
    }

    pub fn set_range(&mut self, start: TickTime, duration: TickTime) -> MarkerResult<()> {
        self.set_start(start)?;
        self.set_duration(duration)
    }

    /// Deep copy under a fresh id. Tag instances keep their ids, matching
    /// plain tag copies.
    pub fn clone_as_new(&self) -> Self {
        let mut copy = self.clone();
        copy.id = Guid::generate();
        copy
    }

    /// Stamps a new marker from a template: fresh marker id, fresh tag
    /// instance ids (each stamping is a new attachment), all other fields
    /// copied.
    pub fn from_template(template: &Self) -> Self {
        let mut stamped = template.clone();
        stamped.id = Guid::generate();
        stamped.owner = None;
        let tags = std::mem::take(&mut stamped.tags);
        for (index, tag) in tags {
            stamped.tags.insert(index, tag.duplicate_unique());
        }
        stamped
    }

    // --- tag index map ---

    /// Appends a tag at one past the current maximum index and returns the
    /// assigned index. Indices start at 1.
    pub fn add_tag(&mut self, tag: TagParam) -> u32 {
        let index = self.tags.keys().next_back().copied().unwrap_or(0) + 1;
        self.tags.insert(index, tag);
        index
    }

    /// Restores a tag at an explicit index (deserialization path). An
    /// existing tag at that index is replaced.
    pub fn insert_tag_at(&mut self, index: u32, tag: TagParam) -> Option<TagParam> {
        self.tags.insert(index, tag)
    }

    /// Removes the tag at `index`, leaving a gap; later appends still go
    /// one past the maximum.
    pub fn remove_tag(&mut self, index: u32) -> Option<TagParam> {
        self.tags.remove(&index)
    }

    pub fn remove_tag_by_id(&mut self, instance_id: &Guid) -> Option<TagParam> {
        let index = self
            .tags
            .iter()
            .find(|(_, tag)| tag.instance_id() == instance_id)
            .map(|(index, _)| *index)?;
        self.tags.remove(&index)
    }

    /// Tags in index order with their current (possibly gapped) indices.
    pub fn tags(&self) -> impl Iterator<Item = (u32, &TagParam)> {
        self.tags.iter().map(|(index, tag)| (*index, tag))
    }

    pub fn tag_values(&self) -> impl Iterator<Item = &TagParam> {
        self.tags.values()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn tag_at(&self, index: u32) -> Option<&TagParam> {
        self.tags.get(&index)
    }

    pub fn tag_at_mut(&mut self, index: u32) -> Option<&mut TagParam> {
        self.tags.get_mut(&index)
    }

    /// Tags renumbered contiguously from 1, relative order preserved. This
    /// is the on-export view; the in-memory indices are untouched.
    pub fn renumbered_tags(&self) -> Vec<(u32, &TagParam)> {
        self.tags
            .values()
            .enumerate()
            .map(|(i, tag)| (i as u32 + 1, tag))
            .collect()
    }

    // --- owner back-reference ---

    /// Resolves the owning clip if it is still alive.
    pub fn owner(&self) -> Option<Arc<dyn MarkerOwner>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_owner(&mut self, owner: &Arc<dyn MarkerOwner>) {
        self.owner = Some(Arc::downgrade(owner));
    }

    pub fn clear_owner(&mut self) {
        self.owner = None;
    }
}

/// Deep field equality. The owner back-reference is transient and
/// excluded; tags compare as a multiset (count and content, independent of
/// index values and ordering).
impl PartialEq for Marker {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.start == other.start
            && self.duration == other.duration
            && self.marker_type == other.marker_type
            && self.name == other.name
            && self.comment == other.comment
            && self.location == other.location
            && self.target == other.target
            && self.cue_point_type == other.cue_point_type
            && self.cue_points == other.cue_points
            && self.speaker == other.speaker
            && self.probability == other.probability
            && tag_multisets_equal(&self.tags, &other.tags)
    }
}

impl Eq for Marker {}

fn tag_multisets_equal(a: &BTreeMap<u32, TagParam>, b: &BTreeMap<u32, TagParam>) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<&TagParam> = a.values().collect();
    let mut right: Vec<&TagParam> = b.values().collect();
    let order = |x: &&TagParam, y: &&TagParam| {
        x.instance_id()
            .cmp(y.instance_id())
            .then_with(|| x.name.cmp(&y.name))
            .then_with(|| x.payload.cmp(&y.payload))
            .then_with(|| x.color.to_argb().cmp(&y.color.to_argb()))
    };
    left.sort_by(order);
    right.sort_by(order);
    left == right
}
