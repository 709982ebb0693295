//! Composite marker: one editable record projected over a multi-marker
//! selection.
//!
//! Getters surface the common value when every selected marker agrees and
//! the [`MULTIPLE_VALUES`] sentinel otherwise; setters fan the new value
//! out to every marker in the selection.

use lc_common::Guid;
use tracing::warn;

use crate::error::{MarkerError, MarkerResult};
use crate::marker::{CuePoint, Marker};
use crate::tracks::MarkerTracks;

/// Reserved sentinel returned when selected markers disagree on a field.
pub const MULTIPLE_VALUES: &str = "multiple values";

/// A selection of marker ids edited as a single record.
///
/// The composite holds ids, not markers; every call resolves against the
/// owning collection so concurrent edits are always visible. Ids whose
/// markers have left the collection are skipped; a selection that resolves
/// to nothing is an error, as is constructing over zero ids.
#[derive(Clone, Debug)]
pub struct CompositeMarker {
    ids: Vec<Guid>,
}

impl CompositeMarker {
    pub fn new(ids: Vec<Guid>) -> MarkerResult<Self> {
        if ids.is_empty() {
            return Err(MarkerError::EmptySelection);
        }
        Ok(Self { ids })
    }

    pub fn ids(&self) -> &[Guid] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn resolve<'a>(&self, tracks: &'a MarkerTracks) -> MarkerResult<Vec<&'a Marker>> {
        let markers: Vec<&Marker> = self.ids.iter().filter_map(|id| tracks.find(id)).collect();
        if markers.len() < self.ids.len() {
            warn!(
                selected = self.ids.len(),
                resolved = markers.len(),
                "composite selection contains stale marker ids"
            );
        }
        if markers.is_empty() {
            return Err(MarkerError::EmptySelection);
        }
        Ok(markers)
    }

    fn common_value<'a>(
        &self,
        tracks: &'a MarkerTracks,
        field: impl Fn(&'a Marker) -> &'a str,
    ) -> MarkerResult<String> {
        let markers = self.resolve(tracks)?;
        let first = field(markers[0]);
        if markers.iter().all(|&m| field(m) == first) {
            Ok(first.to_string())
        } else {
            Ok(MULTIPLE_VALUES.to_string())
        }
    }

    fn apply_all(
        &self,
        tracks: &mut MarkerTracks,
        apply: impl Fn(&mut Marker),
    ) -> MarkerResult<usize> {
        let mut applied = 0;
        for id in &self.ids {
            if tracks.modify(id, |m| apply(m)) {
                applied += 1;
            }
        }
        if applied == 0 {
            return Err(MarkerError::EmptySelection);
        }
        Ok(applied)
    }

    // --- single-valued fields ---

    pub fn name(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.name)
    }

    pub fn set_name(&self, tracks: &mut MarkerTracks, value: &str) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.name = value.to_string())
    }

    pub fn marker_type(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.marker_type)
    }

    pub fn set_marker_type(&self, tracks: &mut MarkerTracks, value: &str) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.marker_type = value.to_string())
    }

    pub fn comment(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.comment)
    }

    pub fn set_comment(&self, tracks: &mut MarkerTracks, value: &str) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.comment = value.to_string())
    }

    pub fn location(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.location)
    }

    pub fn set_location(&self, tracks: &mut MarkerTracks, value: &str) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.location = value.to_string())
    }

    pub fn target(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.target)
    }

    pub fn set_target(&self, tracks: &mut MarkerTracks, value: &str) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.target = value.to_string())
    }

    pub fn speaker(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.speaker)
    }

    pub fn set_speaker(&self, tracks: &mut MarkerTracks, value: &str) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.speaker = value.to_string())
    }

    pub fn probability(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.probability)
    }

    pub fn set_probability(&self, tracks: &mut MarkerTracks, value: &str) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.probability = value.to_string())
    }

    pub fn cue_point_type(&self, tracks: &MarkerTracks) -> MarkerResult<String> {
        self.common_value(tracks, |m| &m.cue_point_type)
    }

    pub fn set_cue_point_type(
        &self,
        tracks: &mut MarkerTracks,
        value: &str,
    ) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| m.cue_point_type = value.to_string())
    }

    // --- cue points ---

    /// Field-wise reconciliation of cue points across the selection.
    ///
    /// Every key present in any selected marker appears in the result; the
    /// value is real where all markers carry that key with one value, and
    /// the sentinel where any marker disagrees or lacks the key. Cue-point
    /// schemas are type-specific, so a selection spanning more than one
    /// marker type short-circuits to an empty list.
    pub fn cue_point_list(&self, tracks: &MarkerTracks) -> MarkerResult<Vec<CuePoint>> {
        let markers = self.resolve(tracks)?;
        let first_type = &markers[0].marker_type;
        if markers.iter().any(|m| &m.marker_type != first_type) {
            return Ok(Vec::new());
        }

        let mut keys: Vec<&str> = Vec::new();
        for marker in &markers {
            for cue in &marker.cue_points {
                if !keys.contains(&cue.key.as_str()) {
                    keys.push(&cue.key);
                }
            }
        }

        let mut merged = Vec::with_capacity(keys.len());
        for key in keys {
            let mut agreed: Option<&str> = None;
            let mut disagree = false;
            for marker in &markers {
                match marker.cue_points.iter().find(|cue| cue.key == key) {
                    Some(cue) => match agreed {
                        None => agreed = Some(&cue.value),
                        Some(value) if value == cue.value => {}
                        Some(_) => {
                            disagree = true;
                            break;
                        }
                    },
                    None => {
                        disagree = true;
                        break;
                    }
                }
            }
            let value = if disagree {
                MULTIPLE_VALUES
            } else {
                agreed.unwrap_or(MULTIPLE_VALUES)
            };
            merged.push(CuePoint::new(key, value));
        }
        Ok(merged)
    }

    /// Sets `key` to `value` on every selected marker, appending the pair
    /// where the key is absent.
    pub fn set_cue_point(
        &self,
        tracks: &mut MarkerTracks,
        key: &str,
        value: &str,
    ) -> MarkerResult<usize> {
        self.apply_all(tracks, |m| {
            match m.cue_points.iter_mut().find(|cue| cue.key == key) {
                Some(cue) => cue.value = value.to_string(),
                None => m.cue_points.push(CuePoint::new(key, value)),
            }
        })
    }
}
