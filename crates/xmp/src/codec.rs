//! Marker collection to XMP packet and back, plus the three-way save merge.
//!
//! Frame counts in the packet are converted to ticks using each track's own
//! frame rate. Decoding never fails on unreadable packet text; it returns an
//! observably degraded result instead, so a damaged sidecar costs the user
//! its markers but not the save. A zero or unparseable frame rate on a track
//! that carries markers is a hard typed error in both directions.

use std::collections::HashSet;

use lc_common::{Guid, MarkerColor, Rational, TickTime};
use lc_marker::{CuePoint, Marker, MarkerTracks, MarkerTypeRegistry, TagParam};
use tracing::warn;

use crate::error::{XmpError, XmpResult};
use crate::packet::{
    format_frame_rate, parse_frame_rate, XmpCuePoint, XmpMarkerRecord, XmpPacket, XmpTag,
    XmpTrack,
};
use crate::toolkit::{BundledToolkit, SerializeOptions, XmpToolkit};

/// Result of decoding a packet. `degraded` is set when the packet text was
/// unreadable and the markers were dropped; `note` then says why.
#[derive(Debug, Default)]
pub struct MarkerDecode {
    pub tracks: MarkerTracks,
    pub degraded: bool,
    pub note: String,
}

// --- encoding ---

/// Renders `markers` as an XMP packet with one track per marker type.
///
/// Track order follows `registry` registration order; types present in the
/// collection but missing from the registry are appended in first-encounter
/// order. Tag indices are renumbered contiguously from 1 in the output;
/// in-memory tag numbering is not touched.
pub fn build_xmp_from_markers(
    markers: &MarkerTracks,
    registry: &MarkerTypeRegistry,
    frame_rate: Rational,
) -> XmpResult<String> {
    build_xmp_from_markers_with(
        &BundledToolkit,
        &SerializeOptions::default(),
        markers,
        registry,
        frame_rate,
    )
}

pub fn build_xmp_from_markers_with(
    toolkit: &dyn XmpToolkit,
    options: &SerializeOptions,
    markers: &MarkerTracks,
    registry: &MarkerTypeRegistry,
    frame_rate: Rational,
) -> XmpResult<String> {
    if frame_rate.is_zero() {
        return Err(XmpError::InvalidFrameRate(frame_rate.to_string()));
    }

    let mut type_names: Vec<&str> = registry
        .iter()
        .map(|def| def.name.as_str())
        .filter(|name| markers.of_type(name).is_some())
        .collect();
    for name in markers.type_names() {
        if !type_names.contains(&name) {
            type_names.push(name);
        }
    }

    let mut packet = XmpPacket::default();
    for type_name in type_names {
        let records = match markers.of_type(type_name) {
            Some(track) => track
                .iter()
                .map(|marker| record_from_marker(marker, frame_rate))
                .collect(),
            None => Vec::new(),
        };
        packet.tracks.push(XmpTrack {
            track_name: type_name.to_string(),
            track_type: type_name.to_string(),
            frame_rate: format_frame_rate(frame_rate),
            markers: records,
        });
    }
    toolkit.serialize_to_buffer(&packet, options)
}

fn record_from_marker(marker: &Marker, rate: Rational) -> XmpMarkerRecord {
    XmpMarkerRecord {
        guid: marker.id().to_string(),
        start_frames: marker.start().to_frames(rate),
        duration_frames: marker.duration().to_frames(rate),
        name: marker.name.clone(),
        comment: marker.comment.clone(),
        location: marker.location.clone(),
        target: marker.target.clone(),
        cue_point_type: marker.cue_point_type.clone(),
        cue_points: marker
            .cue_points
            .iter()
            .map(|cue| XmpCuePoint {
                key: cue.key.clone(),
                value: cue.value.clone(),
            })
            .collect(),
        speaker: marker.speaker.clone(),
        probability: marker.probability.clone(),
        tags: marker
            .renumbered_tags()
            .into_iter()
            .map(|(index, tag)| XmpTag {
                guid: tag.instance_id().to_string(),
                name: tag.name.clone(),
                payload: tag.payload.clone(),
                argb: tag.color.to_argb(),
                index,
            })
            .collect(),
    }
}

// --- decoding ---

/// Rebuilds marker collections from packet text.
///
/// Marker types found in the packet but absent from `registry` are
/// auto-registered so foreign markers survive a round trip.
pub fn build_markers_from_xmp(
    xmp: &str,
    registry: &mut MarkerTypeRegistry,
) -> XmpResult<MarkerDecode> {
    build_markers_from_xmp_with(&BundledToolkit, xmp, registry)
}

pub fn build_markers_from_xmp_with(
    toolkit: &dyn XmpToolkit,
    xmp: &str,
    registry: &mut MarkerTypeRegistry,
) -> XmpResult<MarkerDecode> {
    let packet = match toolkit.parse_from_buffer(xmp) {
        Ok(packet) => packet,
        Err(XmpError::Malformed(note)) => {
            warn!(error = %note, "Treating unreadable XMP as empty marker data");
            return Ok(MarkerDecode {
                tracks: MarkerTracks::new(),
                degraded: true,
                note,
            });
        }
        Err(e) => return Err(e),
    };
    decode_packet(&packet, registry)
}

fn decode_packet(packet: &XmpPacket, registry: &mut MarkerTypeRegistry) -> XmpResult<MarkerDecode> {
    let mut tracks = MarkerTracks::new();
    for track in &packet.tracks {
        let type_name = if track.track_name.is_empty() {
            &track.track_type
        } else {
            &track.track_name
        };
        registry.ensure_registered(type_name);
        if track.markers.is_empty() {
            continue;
        }
        let Some(rate) = parse_frame_rate(&track.frame_rate) else {
            return Err(XmpError::InvalidFrameRate(track.frame_rate.clone()));
        };
        for record in &track.markers {
            tracks.add(marker_from_record(record, type_name, rate)?);
        }
    }
    Ok(MarkerDecode {
        tracks,
        degraded: false,
        note: String::new(),
    })
}

fn marker_from_record(
    record: &XmpMarkerRecord,
    type_name: &str,
    rate: Rational,
) -> XmpResult<Marker> {
    let id = if record.guid.is_empty() {
        Guid::generate()
    } else {
        Guid::from_string(&record.guid)
    };
    let mut marker = Marker::with_id(id, type_name);

    let start_frames = record.start_frames.max(0);
    let duration_frames = record.duration_frames.max(0);
    if start_frames != record.start_frames || duration_frames != record.duration_frames {
        warn!(guid = %record.guid, "Clamped negative marker time from XMP");
    }
    marker
        .set_start(TickTime::from_frames(start_frames, rate))
        .map_err(|e| XmpError::Malformed(e.to_string()))?;
    marker
        .set_duration(TickTime::from_frames(duration_frames, rate))
        .map_err(|e| XmpError::Malformed(e.to_string()))?;

    marker.name = record.name.clone();
    marker.comment = record.comment.clone();
    marker.location = record.location.clone();
    marker.target = record.target.clone();
    marker.cue_point_type = record.cue_point_type.clone();
    marker.cue_points = record
        .cue_points
        .iter()
        .map(|cue| CuePoint::new(&cue.key, &cue.value))
        .collect();
    marker.speaker = record.speaker.clone();
    marker.probability = record.probability.clone();

    for tag in &record.tags {
        let instance_id = if tag.guid.is_empty() {
            Guid::generate()
        } else {
            Guid::from_string(&tag.guid)
        };
        marker.insert_tag_at(
            tag.index,
            TagParam::with_id(
                instance_id,
                &tag.name,
                &tag.payload,
                MarkerColor::from_argb(tag.argb),
            ),
        );
    }
    Ok(marker)
}

// --- merging ---

/// Reconciles session markers with markers saved to the file by someone
/// else since the session last loaded it.
///
/// The session packet wins whenever both sides carry the same marker guid;
/// disk-only markers and disk-only tracks are carried over. Where the two
/// sides disagree on a track's frame rate, carried markers are rescaled
/// into the session rate. Session text that does not parse is an error;
/// unreadable disk text is ignored with a warning, since it can only lose
/// data the session never saw.
pub fn merge_temporal_markers(new_xmp: &str, old_xmp: &str) -> XmpResult<String> {
    merge_temporal_markers_with(&BundledToolkit, new_xmp, old_xmp)
}

pub fn merge_temporal_markers_with(
    toolkit: &dyn XmpToolkit,
    new_xmp: &str,
    old_xmp: &str,
) -> XmpResult<String> {
    let new_packet = toolkit.parse_from_buffer(new_xmp)?;
    let old_packet = match toolkit.parse_from_buffer(old_xmp) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable on-disk XMP during merge");
            XmpPacket::default()
        }
    };
    let merged = merge_packets(new_packet, &old_packet)?;
    toolkit.serialize_to_buffer(&merged, &SerializeOptions::default())
}

fn merge_packets(mut new_packet: XmpPacket, old_packet: &XmpPacket) -> XmpResult<XmpPacket> {
    for old_track in &old_packet.tracks {
        let found = new_packet
            .tracks
            .iter()
            .position(|t| t.track_name == old_track.track_name);
        let Some(index) = found else {
            new_packet.tracks.push(old_track.clone());
            continue;
        };
        if old_track.markers.is_empty() {
            continue;
        }
        let new_track = &mut new_packet.tracks[index];

        let old_rate = parse_frame_rate(&old_track.frame_rate)
            .ok_or_else(|| XmpError::InvalidFrameRate(old_track.frame_rate.clone()))?;
        let new_rate = parse_frame_rate(&new_track.frame_rate)
            .ok_or_else(|| XmpError::InvalidFrameRate(new_track.frame_rate.clone()))?;

        let session_guids: HashSet<String> = new_track
            .markers
            .iter()
            .map(|m| m.guid.clone())
            .collect();
        for old_marker in &old_track.markers {
            if !old_marker.guid.is_empty() && session_guids.contains(&old_marker.guid) {
                continue;
            }
            let mut record = old_marker.clone();
            if old_rate != new_rate {
                record.start_frames = rescale_frames(record.start_frames, old_rate, new_rate);
                record.duration_frames =
                    rescale_frames(record.duration_frames, old_rate, new_rate);
            }
            new_track.markers.push(record);
        }
        new_track.markers.sort_by_key(|m| m.start_frames);
    }
    Ok(new_packet)
}

/// Frame count at `from` expressed in frames at `to`, rounded to nearest.
fn rescale_frames(frames: i64, from: Rational, to: Rational) -> i64 {
    let numer = frames as i128 * to.num as i128 * from.den as i128;
    let denom = from.num as i128 * to.den as i128;
    ((numer + denom / 2) / denom) as i64
}
