//! RDF shape of the marker schema.
//!
//! Markers live under the xmpDM dynamic-media schema: an `xmpDM:Tracks` bag
//! of track resources, each with a `trackName`, `trackType`, `frameRate`,
//! and an `xmpDM:markers` sequence of marker resources. Tag parameters have
//! no xmpDM slot and ride in a sequence under the custom `lct:` namespace.
//! Unknown properties are ignored on read and never round-tripped.

use crate::error::{XmpError, XmpResult};
use crate::packet::{
    XmpCuePoint, XmpMarkerRecord, XmpPacket, XmpTag, XmpTrack, NS_RDF, NS_TAGS, NS_X, NS_XMP_DM,
    XPACKET_BEGIN, XPACKET_ID,
};
use crate::toolkit::SerializeOptions;
use crate::xml::{parse_document, XmlElement, XmlWriter};

const EL_XMPMETA: &str = "x:xmpmeta";
const EL_RDF: &str = "rdf:RDF";
const EL_DESCRIPTION: &str = "rdf:Description";
const EL_BAG: &str = "rdf:Bag";
const EL_SEQ: &str = "rdf:Seq";
const EL_LI: &str = "rdf:li";

const EL_TRACKS: &str = "xmpDM:Tracks";
const EL_TRACK_NAME: &str = "xmpDM:trackName";
const EL_TRACK_TYPE: &str = "xmpDM:trackType";
const EL_FRAME_RATE: &str = "xmpDM:frameRate";
const EL_MARKERS: &str = "xmpDM:markers";
const EL_START_TIME: &str = "xmpDM:startTime";
const EL_DURATION: &str = "xmpDM:duration";
const EL_NAME: &str = "xmpDM:name";
const EL_COMMENT: &str = "xmpDM:comment";
const EL_LOCATION: &str = "xmpDM:location";
const EL_TARGET: &str = "xmpDM:target";
const EL_CUE_POINT_TYPE: &str = "xmpDM:cuePointType";
const EL_CUE_POINT_PARAMS: &str = "xmpDM:cuePointParams";
const EL_KEY: &str = "xmpDM:key";
const EL_VALUE: &str = "xmpDM:value";
const EL_SPEAKER: &str = "xmpDM:speaker";
const EL_PROBABILITY: &str = "xmpDM:probability";
const EL_GUID: &str = "xmpDM:guid";

const EL_TAG_LIST: &str = "lct:tags";
const EL_TAG_GUID: &str = "lct:tagGuid";
const EL_TAG_NAME: &str = "lct:tagName";
const EL_TAG_PAYLOAD: &str = "lct:tagPayload";
const EL_TAG_COLOR: &str = "lct:tagColor";
const EL_TAG_INDEX: &str = "lct:tagIndex";

// --- writing ---

pub fn write_packet(packet: &XmpPacket, options: &SerializeOptions) -> String {
    let mut w = XmlWriter::new();
    if !options.omit_packet_wrapper {
        w.pi(
            "xpacket",
            &format!("begin=\"{XPACKET_BEGIN}\" id=\"{XPACKET_ID}\""),
        );
    }
    w.open_with(EL_XMPMETA, &[("xmlns:x", NS_X)]);
    w.open_with(EL_RDF, &[("xmlns:rdf", NS_RDF)]);
    w.open_with(
        EL_DESCRIPTION,
        &[
            ("rdf:about", ""),
            ("xmlns:xmpDM", NS_XMP_DM),
            ("xmlns:lct", NS_TAGS),
        ],
    );
    if !packet.tracks.is_empty() {
        w.open(EL_TRACKS);
        w.open(EL_BAG);
        for track in &packet.tracks {
            write_track(&mut w, track);
        }
        w.close();
        w.close();
    }
    w.close();
    w.close();
    w.close();
    if !options.omit_packet_wrapper {
        w.pi("xpacket", "end=\"w\"");
    }
    w.finish()
}

fn write_track(w: &mut XmlWriter, track: &XmpTrack) {
    w.open_with(EL_LI, &[("rdf:parseType", "Resource")]);
    w.leaf(EL_TRACK_NAME, &track.track_name);
    w.leaf(EL_TRACK_TYPE, &track.track_type);
    w.leaf(EL_FRAME_RATE, &track.frame_rate);
    if !track.markers.is_empty() {
        w.open(EL_MARKERS);
        w.open(EL_SEQ);
        for marker in &track.markers {
            write_marker(w, marker);
        }
        w.close();
        w.close();
    }
    w.close();
}

fn write_marker(w: &mut XmlWriter, marker: &XmpMarkerRecord) {
    w.open_with(EL_LI, &[("rdf:parseType", "Resource")]);
    w.leaf(EL_START_TIME, &marker.start_frames.to_string());
    if marker.duration_frames != 0 {
        w.leaf(EL_DURATION, &marker.duration_frames.to_string());
    }
    leaf_unless_empty(w, EL_NAME, &marker.name);
    leaf_unless_empty(w, EL_COMMENT, &marker.comment);
    leaf_unless_empty(w, EL_LOCATION, &marker.location);
    leaf_unless_empty(w, EL_TARGET, &marker.target);
    leaf_unless_empty(w, EL_CUE_POINT_TYPE, &marker.cue_point_type);
    if !marker.cue_points.is_empty() {
        w.open(EL_CUE_POINT_PARAMS);
        w.open(EL_SEQ);
        for cue in &marker.cue_points {
            w.open_with(EL_LI, &[("rdf:parseType", "Resource")]);
            w.leaf(EL_KEY, &cue.key);
            w.leaf(EL_VALUE, &cue.value);
            w.close();
        }
        w.close();
        w.close();
    }
    leaf_unless_empty(w, EL_SPEAKER, &marker.speaker);
    leaf_unless_empty(w, EL_PROBABILITY, &marker.probability);
    w.leaf(EL_GUID, &marker.guid);
    if !marker.tags.is_empty() {
        w.open(EL_TAG_LIST);
        w.open(EL_SEQ);
        for tag in &marker.tags {
            w.open_with(EL_LI, &[("rdf:parseType", "Resource")]);
            w.leaf(EL_TAG_GUID, &tag.guid);
            w.leaf(EL_TAG_NAME, &tag.name);
            leaf_unless_empty(w, EL_TAG_PAYLOAD, &tag.payload);
            w.leaf(EL_TAG_COLOR, &tag.argb.to_string());
            w.leaf(EL_TAG_INDEX, &tag.index.to_string());
            w.close();
        }
        w.close();
        w.close();
    }
    w.close();
}

fn leaf_unless_empty(w: &mut XmlWriter, name: &str, text: &str) {
    if !text.is_empty() {
        w.leaf(name, text);
    }
}

// --- reading ---

pub fn parse_packet(input: &str) -> XmpResult<XmpPacket> {
    let root = parse_document(input)?;
    let rdf = find_rdf(&root)
        .ok_or_else(|| XmpError::Malformed("no rdf:RDF element in packet".into()))?;

    let mut packet = XmpPacket::default();
    for description in rdf.children_named(EL_DESCRIPTION) {
        let Some(tracks) = description.child(EL_TRACKS) else {
            continue;
        };
        let Some(bag) = list_of(tracks) else {
            continue;
        };
        for li in bag.children_named(EL_LI) {
            packet.tracks.push(parse_track(resource(li))?);
        }
    }
    Ok(packet)
}

fn find_rdf(root: &XmlElement) -> Option<&XmlElement> {
    if root.name == EL_RDF {
        return Some(root);
    }
    if root.name == EL_XMPMETA {
        return root.child(EL_RDF);
    }
    None
}

/// RDF containers are a Bag or Seq; marker files in the wild use both.
fn list_of(property: &XmlElement) -> Option<&XmlElement> {
    property.child(EL_BAG).or_else(|| property.child(EL_SEQ))
}

/// A `parseType="Resource"` li carries its properties directly; the verbose
/// form nests them in an `rdf:Description`.
fn resource(li: &XmlElement) -> &XmlElement {
    li.child(EL_DESCRIPTION).unwrap_or(li)
}

fn parse_track(el: &XmlElement) -> XmpResult<XmpTrack> {
    let mut track = XmpTrack::default();
    for child in el.elements() {
        match child.name.as_str() {
            EL_TRACK_NAME => track.track_name = child.text(),
            EL_TRACK_TYPE => track.track_type = child.text(),
            EL_FRAME_RATE => track.frame_rate = child.text(),
            EL_MARKERS => {
                let Some(seq) = list_of(child) else {
                    continue;
                };
                for li in seq.children_named(EL_LI) {
                    track.markers.push(parse_marker(resource(li))?);
                }
            }
            _ => {}
        }
    }
    Ok(track)
}

fn parse_marker(el: &XmlElement) -> XmpResult<XmpMarkerRecord> {
    let mut marker = XmpMarkerRecord::default();
    for child in el.elements() {
        match child.name.as_str() {
            EL_START_TIME => marker.start_frames = parse_i64(child)?,
            EL_DURATION => marker.duration_frames = parse_i64(child)?,
            EL_NAME => marker.name = child.text(),
            EL_COMMENT => marker.comment = child.text(),
            EL_LOCATION => marker.location = child.text(),
            EL_TARGET => marker.target = child.text(),
            EL_CUE_POINT_TYPE => marker.cue_point_type = child.text(),
            EL_CUE_POINT_PARAMS => {
                let Some(seq) = list_of(child) else {
                    continue;
                };
                for li in seq.children_named(EL_LI) {
                    let cue = resource(li);
                    marker.cue_points.push(XmpCuePoint {
                        key: cue.child(EL_KEY).map(XmlElement::text).unwrap_or_default(),
                        value: cue
                            .child(EL_VALUE)
                            .map(XmlElement::text)
                            .unwrap_or_default(),
                    });
                }
            }
            EL_SPEAKER => marker.speaker = child.text(),
            EL_PROBABILITY => marker.probability = child.text(),
            EL_GUID => marker.guid = child.text(),
            EL_TAG_LIST => {
                let Some(seq) = list_of(child) else {
                    continue;
                };
                for li in seq.children_named(EL_LI) {
                    marker.tags.push(parse_tag(resource(li))?);
                }
            }
            _ => {}
        }
    }
    Ok(marker)
}

fn parse_tag(el: &XmlElement) -> XmpResult<XmpTag> {
    let mut tag = XmpTag::default();
    for child in el.elements() {
        match child.name.as_str() {
            EL_TAG_GUID => tag.guid = child.text(),
            EL_TAG_NAME => tag.name = child.text(),
            EL_TAG_PAYLOAD => tag.payload = child.text(),
            EL_TAG_COLOR => tag.argb = parse_u32(child)?,
            EL_TAG_INDEX => tag.index = parse_u32(child)?,
            _ => {}
        }
    }
    Ok(tag)
}

fn parse_i64(el: &XmlElement) -> XmpResult<i64> {
    let text = el.text();
    text.parse().map_err(|_| {
        XmpError::Malformed(format!("non-numeric value {:?} in <{}>", text, el.name))
    })
}

fn parse_u32(el: &XmlElement) -> XmpResult<u32> {
    let text = el.text();
    text.parse().map_err(|_| {
        XmpError::Malformed(format!("non-numeric value {:?} in <{}>", text, el.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> XmpPacket {
        XmpPacket {
            tracks: vec![
                XmpTrack {
                    track_name: "Comment".into(),
                    track_type: "Comment".into(),
                    frame_rate: "f24".into(),
                    markers: vec![XmpMarkerRecord {
                        guid: "m-1".into(),
                        start_frames: 12,
                        duration_frames: 48,
                        name: "Good take".into(),
                        comment: "needs <trim> & grade".into(),
                        cue_points: vec![XmpCuePoint {
                            key: "scene".into(),
                            value: "7".into(),
                        }],
                        speaker: "A".into(),
                        tags: vec![XmpTag {
                            guid: "t-1".into(),
                            name: "hero".into(),
                            payload: "shot".into(),
                            argb: 0xff00ff00,
                            index: 1,
                        }],
                        ..Default::default()
                    }],
                },
                XmpTrack {
                    track_name: "Chapter".into(),
                    track_type: "Chapter".into(),
                    frame_rate: "f30000s1001".into(),
                    markers: vec![XmpMarkerRecord {
                        guid: "m-2".into(),
                        start_frames: 100,
                        ..Default::default()
                    }],
                },
            ],
        }
    }

    #[test]
    fn packet_round_trips() {
        let packet = sample_packet();
        let text = write_packet(&packet, &SerializeOptions::default());
        let parsed = parse_packet(&text).unwrap();
        assert_eq!(parsed, packet);
    }

    #[test]
    fn wrapper_is_present_unless_omitted() {
        let packet = sample_packet();
        let wrapped = write_packet(&packet, &SerializeOptions::default());
        assert!(wrapped.starts_with("<?xpacket begin="));
        assert!(wrapped.contains(XPACKET_ID));
        assert!(wrapped.trim_end().ends_with("<?xpacket end=\"w\"?>"));

        let bare = write_packet(
            &packet,
            &SerializeOptions {
                omit_packet_wrapper: true,
            },
        );
        assert!(!bare.contains("xpacket"));
        assert!(bare.starts_with("<x:xmpmeta"));
    }

    #[test]
    fn parse_accepts_bare_rdf_root() {
        let text = write_packet(
            &sample_packet(),
            &SerializeOptions {
                omit_packet_wrapper: true,
            },
        );
        let start = text.find("<rdf:RDF").unwrap();
        let end = text.find("</rdf:RDF>").unwrap() + "</rdf:RDF>".len();
        let parsed = parse_packet(&text[start..end]).unwrap();
        assert_eq!(parsed, sample_packet());
    }

    #[test]
    fn parse_accepts_description_wrapped_resources() {
        let text = "<rdf:RDF>\
            <rdf:Description>\
            <xmpDM:Tracks><rdf:Bag><rdf:li><rdf:Description>\
            <xmpDM:trackName>Comment</xmpDM:trackName>\
            <xmpDM:trackType>Comment</xmpDM:trackType>\
            <xmpDM:frameRate>f25</xmpDM:frameRate>\
            <xmpDM:markers><rdf:Seq><rdf:li><rdf:Description>\
            <xmpDM:startTime>5</xmpDM:startTime>\
            <xmpDM:guid>g</xmpDM:guid>\
            </rdf:Description></rdf:li></rdf:Seq></xmpDM:markers>\
            </rdf:Description></rdf:li></rdf:Bag></xmpDM:Tracks>\
            </rdf:Description></rdf:RDF>";
        let parsed = parse_packet(text).unwrap();
        assert_eq!(parsed.tracks.len(), 1);
        assert_eq!(parsed.tracks[0].frame_rate, "f25");
        assert_eq!(parsed.tracks[0].markers[0].start_frames, 5);
        assert_eq!(parsed.tracks[0].markers[0].guid, "g");
    }

    #[test]
    fn unknown_properties_are_ignored() {
        let text = "<rdf:RDF><rdf:Description>\
            <xmpDM:Tracks><rdf:Bag><rdf:li rdf:parseType=\"Resource\">\
            <xmpDM:trackName>Comment</xmpDM:trackName>\
            <xmpDM:frameRate>f24</xmpDM:frameRate>\
            <xmpDM:somethingNew>ignored</xmpDM:somethingNew>\
            <xmpDM:markers><rdf:Seq><rdf:li rdf:parseType=\"Resource\">\
            <xmpDM:startTime>1</xmpDM:startTime>\
            <xmpDM:fancyNewField>also ignored</xmpDM:fancyNewField>\
            <xmpDM:guid>g</xmpDM:guid>\
            </rdf:li></rdf:Seq></xmpDM:markers>\
            </rdf:li></rdf:Bag></xmpDM:Tracks>\
            </rdf:Description></rdf:RDF>";
        let parsed = parse_packet(text).unwrap();
        assert_eq!(parsed.tracks[0].markers.len(), 1);
    }

    #[test]
    fn packet_without_tracks_parses_empty() {
        let parsed = parse_packet("<rdf:RDF><rdf:Description/></rdf:RDF>").unwrap();
        assert!(parsed.tracks.is_empty());
    }

    #[test]
    fn missing_rdf_element_is_malformed() {
        assert!(matches!(
            parse_packet("<x:xmpmeta></x:xmpmeta>"),
            Err(XmpError::Malformed(_))
        ));
    }

    #[test]
    fn non_numeric_start_time_is_malformed() {
        let text = "<rdf:RDF><rdf:Description>\
            <xmpDM:Tracks><rdf:Bag><rdf:li rdf:parseType=\"Resource\">\
            <xmpDM:trackName>Comment</xmpDM:trackName>\
            <xmpDM:markers><rdf:Seq><rdf:li rdf:parseType=\"Resource\">\
            <xmpDM:startTime>twelve</xmpDM:startTime>\
            </rdf:li></rdf:Seq></xmpDM:markers>\
            </rdf:li></rdf:Bag></xmpDM:Tracks>\
            </rdf:Description></rdf:RDF>";
        assert!(matches!(parse_packet(text), Err(XmpError::Malformed(_))));
    }
}
