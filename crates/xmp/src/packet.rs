//! In-memory form of the marker-bearing slice of an XMP packet.
//!
//! Times in this representation are whole frame counts; the frame rate that
//! defines the frame unit travels with each track as the raw `f{num}` or
//! `f{num}s{den}` string from the packet.

use lc_common::Rational;

/// Magic id carried by the xpacket begin instruction.
pub const XPACKET_ID: &str = "W5M0MpCehiHzreSzNTczkc9d";

/// Byte-order mark carried in the xpacket `begin` attribute.
pub const XPACKET_BEGIN: &str = "\u{feff}";

pub const NS_X: &str = "adobe:ns:meta/";
pub const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const NS_XMP_DM: &str = "http://ns.adobe.com/xmp/1.0/DynamicMedia/";

/// Schema for tag parameters, which plain xmpDM has no slot for.
pub const NS_TAGS: &str = "http://ns.logcut.org/tags/1.0/";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmpPacket {
    pub tracks: Vec<XmpTrack>,
}

/// One marker track: a named, typed lane of markers sharing a frame rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmpTrack {
    pub track_name: String,
    pub track_type: String,
    /// Raw rate string, e.g. `f24` or `f30000s1001`.
    pub frame_rate: String,
    pub markers: Vec<XmpMarkerRecord>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmpMarkerRecord {
    pub guid: String,
    pub start_frames: i64,
    pub duration_frames: i64,
    pub name: String,
    pub comment: String,
    pub location: String,
    pub target: String,
    pub cue_point_type: String,
    pub cue_points: Vec<XmpCuePoint>,
    pub speaker: String,
    pub probability: String,
    pub tags: Vec<XmpTag>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmpCuePoint {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmpTag {
    pub guid: String,
    pub name: String,
    pub payload: String,
    pub argb: u32,
    pub index: u32,
}

/// Parses `f{num}` or `f{num}s{den}`. Zero or unparseable rates yield
/// `None`; converting frames with such a rate is the caller's error case.
pub fn parse_frame_rate(raw: &str) -> Option<Rational> {
    let rest = raw.strip_prefix('f')?;
    let (num, den) = match rest.split_once('s') {
        Some((n, d)) => (n.parse::<u32>().ok()?, d.parse::<u32>().ok()?),
        None => (rest.parse::<u32>().ok()?, 1),
    };
    if num == 0 || den == 0 {
        return None;
    }
    Some(Rational::new(num, den))
}

pub fn format_frame_rate(rate: Rational) -> String {
    if rate.den == 1 {
        format!("f{}", rate.num)
    } else {
        format!("f{}s{}", rate.num, rate.den)
    }
}
