//! The `.rcut` document format.
//!
//! A rough cut persists as a small XML blob: the cut's identity, the
//! ordered clip list, and the transition placements. Per-document viewer
//! settings live in a JSON sidecar next to the document; losing the sidecar
//! loses nothing but preferences, so its load path is lenient.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use lc_common::{Guid, Rational, TickTime};
use lc_library::{
    AssetItem, AssetKind, MediaKind, TrackTransitionMap, TransitionAlignment, TransitionItem,
};
use lc_xmp::packet::{format_frame_rate, parse_frame_rate};
use lc_xmp::xml::{parse_document, XmlElement, XmlWriter};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RoughCutError, RoughCutResult};
use crate::host::atomic_write;

pub const ROUGH_CUT_EXTENSION: &str = "rcut";
pub const ROUGH_CUT_CONTENT_VERSION: u32 = 1;

const EL_ROUGH_CUT: &str = "roughCut";
const EL_CLIPS: &str = "clips";
const EL_CLIP: &str = "clip";
const EL_VIDEO_TRANSITIONS: &str = "videoTransitions";
const EL_AUDIO_TRANSITIONS: &str = "audioTransitions";
const EL_TRANSITION: &str = "transition";

/// True for paths carrying the rough-cut document extension.
pub fn is_rough_cut_file_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ROUGH_CUT_EXTENSION))
}

/// Serializes a rough cut to document text. `cut` must be the rough-cut
/// asset itself; `clips` is the ordered clip list.
pub fn build_rough_cut_content(cut: &AssetItem, clips: &[AssetItem]) -> RoughCutResult<String> {
    if cut.kind() != AssetKind::RoughCut {
        return Err(RoughCutError::NotARoughCut);
    }

    let mut w = XmlWriter::new();
    w.pi("xml", "version=\"1.0\" encoding=\"UTF-8\"");
    let version = ROUGH_CUT_CONTENT_VERSION.to_string();
    w.open_with(
        EL_ROUGH_CUT,
        &[
            ("version", version.as_str()),
            ("id", cut.id().as_str()),
            ("name", &cut.name),
        ],
    );

    w.open(EL_CLIPS);
    for clip in clips {
        write_clip(&mut w, clip);
    }
    w.close();

    write_transitions(&mut w, EL_VIDEO_TRANSITIONS, &cut.video_transitions);
    write_transitions(&mut w, EL_AUDIO_TRANSITIONS, &cut.audio_transitions);

    w.close();
    Ok(w.finish())
}

fn write_clip(w: &mut XmlWriter, clip: &AssetItem) {
    let in_point = clip.in_point.ticks().to_string();
    let out_point = clip.out_point.ticks().to_string();
    let mut attrs: Vec<(&str, String)> = vec![
        ("id", clip.id().to_string()),
        ("parentId", clip.parent_id.to_string()),
        ("kind", clip.kind().as_str().to_string()),
        ("name", clip.name.clone()),
        ("mediaPath", clip.media_path.clone()),
        ("in", in_point),
        ("out", out_point),
    ];
    if let Some(custom_in) = clip.custom_in {
        attrs.push(("customIn", custom_in.ticks().to_string()));
    }
    if let Some(custom_out) = clip.custom_out {
        attrs.push(("customOut", custom_out.ticks().to_string()));
    }
    let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(n, v)| (*n, v.as_str())).collect();
    w.empty_with(EL_CLIP, &borrowed);
}

fn write_transitions(w: &mut XmlWriter, element: &str, map: &TrackTransitionMap) {
    w.open(element);
    for (track, item) in map.iter_all() {
        let attrs: Vec<(&str, String)> = vec![
            ("effectId", item.effect_id.clone()),
            ("track", track.to_string()),
            ("start", item.start.ticks().to_string()),
            ("end", item.end.ticks().to_string()),
            ("cutPoint", item.cut_point.ticks().to_string()),
            ("frameRate", format_frame_rate(item.frame_rate)),
            ("alignment", item.alignment.as_str().to_string()),
            ("startRatio", item.start_ratio.to_string()),
            ("endRatio", item.end_ratio.to_string()),
            ("reverse", item.reverse.to_string()),
        ];
        let borrowed: Vec<(&str, &str)> = attrs.iter().map(|(n, v)| (*n, v.as_str())).collect();
        w.empty_with(EL_TRANSITION, &borrowed);
    }
    w.close();
}

/// A rough cut as read back from its document.
#[derive(Clone, Debug, Default)]
pub struct LoadedRoughCut {
    pub id: Guid,
    pub name: String,
    pub clips: Vec<AssetItem>,
    pub video_transitions: TrackTransitionMap,
    pub audio_transitions: TrackTransitionMap,
}

/// Parses document text produced by [`build_rough_cut_content`].
pub fn load_rough_cut(text: &str) -> RoughCutResult<LoadedRoughCut> {
    let root = parse_document(text)?;
    if root.name != EL_ROUGH_CUT {
        return Err(RoughCutError::NotARoughCut);
    }
    let version: u32 = root
        .attr("version")
        .unwrap_or("0")
        .parse()
        .map_err(|_| RoughCutError::MalformedDocument("unreadable version".into()))?;
    if version != ROUGH_CUT_CONTENT_VERSION {
        return Err(RoughCutError::UnsupportedVersion(version));
    }

    let mut loaded = LoadedRoughCut {
        id: guid_attr(&root, "id"),
        name: root.attr("name").unwrap_or_default().to_string(),
        ..LoadedRoughCut::default()
    };
    if loaded.id.is_nil() {
        loaded.id = Guid::generate();
    }

    if let Some(clips) = root.child(EL_CLIPS) {
        for clip in clips.children_named(EL_CLIP) {
            loaded.clips.push(clip_from_element(clip)?);
        }
    }
    if let Some(el) = root.child(EL_VIDEO_TRANSITIONS) {
        loaded.video_transitions = transitions_from_element(el, MediaKind::Video)?;
    }
    if let Some(el) = root.child(EL_AUDIO_TRANSITIONS) {
        loaded.audio_transitions = transitions_from_element(el, MediaKind::Audio)?;
    }
    Ok(loaded)
}

fn clip_from_element(el: &XmlElement) -> RoughCutResult<AssetItem> {
    let kind_name = el.attr("kind").unwrap_or("");
    let kind = AssetKind::from_name(kind_name).ok_or_else(|| {
        RoughCutError::MalformedDocument(format!("unknown asset kind {kind_name:?}"))
    })?;
    let mut id = guid_attr(el, "id");
    if id.is_nil() {
        id = Guid::generate();
    }
    let mut item = AssetItem::with_id(
        kind,
        id,
        el.attr("name").unwrap_or_default(),
        el.attr("mediaPath").unwrap_or_default(),
    );
    item.parent_id = guid_attr(el, "parentId");
    item.in_point = ticks_attr(el, "in")?;
    item.out_point = ticks_attr(el, "out")?;
    item.custom_in = opt_ticks_attr(el, "customIn")?;
    item.custom_out = opt_ticks_attr(el, "customOut")?;
    Ok(item)
}

fn transitions_from_element(
    el: &XmlElement,
    media_kind: MediaKind,
) -> RoughCutResult<TrackTransitionMap> {
    let mut map = TrackTransitionMap::new();
    for t in el.children_named(EL_TRANSITION) {
        let track: u32 = t
            .attr("track")
            .unwrap_or("0")
            .parse()
            .map_err(|_| RoughCutError::MalformedDocument("unreadable track index".into()))?;
        let mut item = TransitionItem::new(
            t.attr("effectId").unwrap_or_default(),
            track,
            ticks_attr(t, "start")?,
            ticks_attr(t, "end")?,
        );
        if let Some(cut_point) = opt_ticks_attr(t, "cutPoint")? {
            item.cut_point = cut_point;
        }
        if let Some(raw) = t.attr("frameRate") {
            item.frame_rate = parse_frame_rate(raw).ok_or_else(|| {
                RoughCutError::MalformedDocument(format!("unreadable frame rate {raw:?}"))
            })?;
        }
        // Unknown alignment names fall back to the default so newer
        // documents still open.
        item.alignment = t
            .attr("alignment")
            .and_then(TransitionAlignment::from_name)
            .unwrap_or_default();
        item.start_ratio = ratio_attr(t, "startRatio", 0.0)?;
        item.end_ratio = ratio_attr(t, "endRatio", 1.0)?;
        item.reverse = t.attr("reverse") == Some("true");
        item.media_kind = media_kind;
        map.insert(item);
    }
    Ok(map)
}

fn guid_attr(el: &XmlElement, name: &str) -> Guid {
    match el.attr(name) {
        Some(value) if !value.is_empty() => Guid::from_string(value),
        _ => Guid::nil(),
    }
}

fn ticks_attr(el: &XmlElement, name: &str) -> RoughCutResult<TickTime> {
    Ok(opt_ticks_attr(el, name)?.unwrap_or(TickTime::ZERO))
}

fn opt_ticks_attr(el: &XmlElement, name: &str) -> RoughCutResult<Option<TickTime>> {
    let Some(raw) = el.attr(name) else {
        return Ok(None);
    };
    let ticks: i64 = raw.parse().map_err(|_| {
        RoughCutError::MalformedDocument(format!("unreadable time in {name}: {raw:?}"))
    })?;
    Ok(Some(TickTime::from_ticks(ticks)))
}

fn ratio_attr(el: &XmlElement, name: &str, default: f32) -> RoughCutResult<f32> {
    let Some(raw) = el.attr(name) else {
        return Ok(default);
    };
    raw.parse().map_err(|_| {
        RoughCutError::MalformedDocument(format!("unreadable ratio in {name}: {raw:?}"))
    })
}

/// Writes document text to disk atomically.
pub fn save_rough_cut_file(path: &Path, content: &str) -> io::Result<()> {
    atomic_write(path, content.as_bytes())
}

/// Reads and parses a rough-cut document.
pub fn load_rough_cut_file(path: &Path) -> RoughCutResult<LoadedRoughCut> {
    let text = fs::read_to_string(path)?;
    load_rough_cut(&text)
}

/// Per-document viewer preferences, persisted next to the document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<Rational>,
    /// Where the next send-to-sequence should insert, in ticks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_insert_point: Option<TickTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_template: Option<String>,
}

/// Sidecar location for a document path.
pub fn sidecar_path(document: &Path) -> PathBuf {
    let mut name = document
        .file_name()
        .map(std::ffi::OsString::from)
        .unwrap_or_default();
    name.push(".settings");
    document.with_file_name(name)
}

/// Persists sidecar settings atomically as pretty JSON.
pub fn save_sidecar_settings(document: &Path, settings: &SidecarSettings) -> io::Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    atomic_write(&sidecar_path(document), json.as_bytes())
}

/// Loads sidecar settings, falling back to defaults when the sidecar is
/// missing or unreadable.
pub fn load_sidecar_settings(document: &Path) -> SidecarSettings {
    let path = sidecar_path(document);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return SidecarSettings::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read sidecar settings, using defaults");
            return SidecarSettings::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse sidecar settings, using defaults");
            SidecarSettings::default()
        }
    }
}
