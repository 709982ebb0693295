//! Asset model -- master clips, sub-clips, and rough cuts.
//!
//! Assets are identity-bearing: two items are "the same" only in the
//! specific sense asked for ([`AssetItem::same_id`] or
//! [`AssetItem::same_media_path`]), so the type deliberately does not
//! implement `PartialEq`.

use std::fmt;

use lc_common::{Guid, TickTime};
use lc_marker::Marker;

use crate::error::{LibraryError, LibraryResult};
use crate::transition::TrackTransitionMap;

/// The structural role of an asset in the library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// A clip backed directly by a media file.
    MasterClip,
    /// A range of a master clip (or of another sub-clip).
    SubClip,
    /// An ordered sequence of clip references, saved as its own document.
    RoughCut,
    /// A range of a rough cut.
    RoughCutSubClip,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::MasterClip => "MasterClip",
            AssetKind::SubClip => "SubClip",
            AssetKind::RoughCut => "RoughCut",
            AssetKind::RoughCutSubClip => "RoughCutSubClip",
        }
    }

    /// Only rough cuts own an ordered list of child assets.
    pub fn owns_children(self) -> bool {
        matches!(self, AssetKind::RoughCut)
    }

    pub fn is_rough_cut_kind(self) -> bool {
        matches!(self, AssetKind::RoughCut | AssetKind::RoughCutSubClip)
    }

    /// Parses the serialized kind name.
    pub fn from_name(name: &str) -> Option<AssetKind> {
        match name {
            "MasterClip" => Some(AssetKind::MasterClip),
            "SubClip" => Some(AssetKind::SubClip),
            "RoughCut" => Some(AssetKind::RoughCut),
            "RoughCutSubClip" => Some(AssetKind::RoughCutSubClip),
            _ => None,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item in the project library.
///
/// The kind and identity are fixed at construction; everything else is
/// plain data the owning document mutates directly.
#[derive(Clone, Debug)]
pub struct AssetItem {
    kind: AssetKind,
    id: Guid,
    /// Child assets, populated only for [`AssetKind::RoughCut`].
    sub_items: Vec<AssetItem>,
    /// Id of the asset this one was carved from; nil for top-level items.
    pub parent_id: Guid,
    /// Key into the [`crate::MediaInfoRegistry`]; nil until media is bound.
    pub media_info_id: Guid,
    pub media_path: String,
    pub name: String,
    pub in_point: TickTime,
    pub out_point: TickTime,
    /// User override of `in_point`, kept separate so it can be cleared.
    pub custom_in: Option<TickTime>,
    pub custom_out: Option<TickTime>,
    pub video_transitions: TrackTransitionMap,
    pub audio_transitions: TrackTransitionMap,
}

impl AssetItem {
    fn bare(kind: AssetKind, name: impl Into<String>, media_path: impl Into<String>) -> AssetItem {
        AssetItem {
            kind,
            id: Guid::generate(),
            sub_items: Vec::new(),
            parent_id: Guid::nil(),
            media_info_id: Guid::nil(),
            media_path: media_path.into(),
            name: name.into(),
            in_point: TickTime::ZERO,
            out_point: TickTime::ZERO,
            custom_in: None,
            custom_out: None,
            video_transitions: TrackTransitionMap::default(),
            audio_transitions: TrackTransitionMap::default(),
        }
    }

    /// New master clip over a media file.
    pub fn master_clip(name: impl Into<String>, media_path: impl Into<String>) -> AssetItem {
        AssetItem::bare(AssetKind::MasterClip, name, media_path)
    }

    /// New rough cut. `media_path` is the path of its document on disk and
    /// may be empty until the first save.
    pub fn rough_cut(name: impl Into<String>, media_path: impl Into<String>) -> AssetItem {
        AssetItem::bare(AssetKind::RoughCut, name, media_path)
    }

    /// Reconstructs an item loaded from a document, keeping its persisted
    /// identity instead of generating a fresh one.
    pub fn with_id(
        kind: AssetKind,
        id: Guid,
        name: impl Into<String>,
        media_path: impl Into<String>,
    ) -> AssetItem {
        let mut item = AssetItem::bare(kind, name, media_path);
        item.id = id;
        item
    }

    /// New sub-clip covering `[in_point, out_point)` of `parent`. The child
    /// shares the parent's media identity and records the parent's id.
    pub fn sub_clip(
        parent: &AssetItem,
        name: impl Into<String>,
        in_point: TickTime,
        out_point: TickTime,
    ) -> LibraryResult<AssetItem> {
        if parent.kind.is_rough_cut_kind() {
            return Err(LibraryError::WrongAssetKind {
                expected: "master clip or sub-clip",
                found: parent.kind,
            });
        }
        AssetItem::ranged_child(AssetKind::SubClip, parent, name.into(), in_point, out_point)
    }

    /// New sub-clip of a rough cut.
    pub fn rough_cut_sub_clip(
        parent: &AssetItem,
        name: impl Into<String>,
        in_point: TickTime,
        out_point: TickTime,
    ) -> LibraryResult<AssetItem> {
        if parent.kind != AssetKind::RoughCut {
            return Err(LibraryError::WrongAssetKind {
                expected: "rough cut",
                found: parent.kind,
            });
        }
        AssetItem::ranged_child(
            AssetKind::RoughCutSubClip,
            parent,
            name.into(),
            in_point,
            out_point,
        )
    }

    /// New sub-clip spanning a marker's range. The clip is named after the
    /// marker, falling back to the marker's type when it has no name.
    pub fn sub_clip_from_marker(parent: &AssetItem, marker: &Marker) -> LibraryResult<AssetItem> {
        let name = if marker.name.is_empty() {
            marker.marker_type.clone()
        } else {
            marker.name.clone()
        };
        AssetItem::sub_clip(parent, name, marker.start(), marker.end())
    }

    fn ranged_child(
        kind: AssetKind,
        parent: &AssetItem,
        name: String,
        in_point: TickTime,
        out_point: TickTime,
    ) -> LibraryResult<AssetItem> {
        if out_point < in_point {
            return Err(LibraryError::InvalidSubClipRange {
                in_point,
                out_point,
            });
        }
        let mut item = AssetItem::bare(kind, name, parent.media_path.clone());
        item.parent_id = parent.id.clone();
        item.media_info_id = parent.media_info_id.clone();
        item.in_point = in_point;
        item.out_point = out_point;
        Ok(item)
    }

    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn id(&self) -> &Guid {
        &self.id
    }

    /// Appends a child asset. Fails unless this asset's kind owns children.
    pub fn add_sub_item(&mut self, item: AssetItem) -> LibraryResult<()> {
        if !self.kind.owns_children() {
            return Err(LibraryError::ChildrenOnLeafAsset { kind: self.kind });
        }
        self.sub_items.push(item);
        Ok(())
    }

    /// Replaces the child list wholesale, preserving the given order.
    pub fn set_sub_items(&mut self, items: Vec<AssetItem>) -> LibraryResult<()> {
        if !self.kind.owns_children() && !items.is_empty() {
            return Err(LibraryError::ChildrenOnLeafAsset { kind: self.kind });
        }
        self.sub_items = items;
        Ok(())
    }

    pub fn sub_items(&self) -> &[AssetItem] {
        &self.sub_items
    }

    /// True when both items reference the same media file, ignoring case.
    pub fn same_media_path(&self, other: &AssetItem) -> bool {
        self.media_path.eq_ignore_ascii_case(&other.media_path)
    }

    /// True when both items are the same library entry.
    pub fn same_id(&self, other: &AssetItem) -> bool {
        self.id == other.id
    }

    pub fn duration(&self) -> TickTime {
        self.out_point - self.in_point
    }

    /// In point after applying any user override.
    pub fn effective_in_point(&self) -> TickTime {
        self.custom_in.unwrap_or(self.in_point)
    }

    /// Out point after applying any user override.
    pub fn effective_out_point(&self) -> TickTime {
        self.custom_out.unwrap_or(self.out_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_common::Rational;

    fn seconds(s: f64) -> TickTime {
        TickTime::from_seconds(s)
    }

    fn master_with_range(out_secs: f64) -> AssetItem {
        let mut clip = AssetItem::master_clip("Interview A", "D:/Footage/interview_a.mov");
        clip.out_point = seconds(out_secs);
        clip
    }

    #[test]
    fn master_clip_has_identity_and_no_parent() {
        let clip = master_with_range(10.0);
        assert_eq!(clip.kind(), AssetKind::MasterClip);
        assert!(!clip.id().is_nil());
        assert!(clip.parent_id.is_nil());
        assert!(clip.sub_items().is_empty());
    }

    #[test]
    fn sub_clip_inherits_media_identity() {
        let mut parent = master_with_range(60.0);
        parent.media_info_id = Guid::generate();

        let child =
            AssetItem::sub_clip(&parent, "Take 3", seconds(4.0), seconds(9.0)).unwrap();
        assert_eq!(child.kind(), AssetKind::SubClip);
        assert_eq!(child.media_path, parent.media_path);
        assert_eq!(child.media_info_id, parent.media_info_id);
        assert_eq!(&child.parent_id, parent.id());
        assert_eq!(child.duration(), seconds(5.0));
    }

    #[test]
    fn sub_clip_rejects_inverted_range() {
        let parent = master_with_range(60.0);
        let err = AssetItem::sub_clip(&parent, "bad", seconds(9.0), seconds(4.0)).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidSubClipRange { .. }));
    }

    #[test]
    fn sub_clip_rejects_rough_cut_parent() {
        let cut = AssetItem::rough_cut("Selects", "");
        let err = AssetItem::sub_clip(&cut, "x", TickTime::ZERO, seconds(1.0)).unwrap_err();
        assert!(matches!(
            err,
            LibraryError::WrongAssetKind {
                found: AssetKind::RoughCut,
                ..
            }
        ));
    }

    #[test]
    fn rough_cut_sub_clip_requires_rough_cut_parent() {
        let cut = AssetItem::rough_cut("Selects", "");
        let child =
            AssetItem::rough_cut_sub_clip(&cut, "intro", TickTime::ZERO, seconds(3.0)).unwrap();
        assert_eq!(child.kind(), AssetKind::RoughCutSubClip);

        let clip = master_with_range(10.0);
        assert!(AssetItem::rough_cut_sub_clip(&clip, "x", TickTime::ZERO, seconds(1.0)).is_err());
    }

    #[test]
    fn only_rough_cuts_own_children() {
        let mut cut = AssetItem::rough_cut("Selects", "");
        cut.add_sub_item(master_with_range(5.0)).unwrap();
        assert_eq!(cut.sub_items().len(), 1);

        let mut clip = master_with_range(5.0);
        let err = clip.add_sub_item(master_with_range(2.0)).unwrap_err();
        assert!(matches!(
            err,
            LibraryError::ChildrenOnLeafAsset {
                kind: AssetKind::MasterClip
            }
        ));
    }

    #[test]
    fn set_sub_items_clears_leaf_assets_but_refuses_content() {
        let mut clip = master_with_range(5.0);
        clip.set_sub_items(Vec::new()).unwrap();
        assert!(clip
            .set_sub_items(vec![master_with_range(1.0)])
            .is_err());
    }

    #[test]
    fn media_path_comparison_ignores_case() {
        let a = AssetItem::master_clip("a", "D:/Footage/Card01/CLIP.MOV");
        let b = AssetItem::master_clip("b", "d:/footage/card01/clip.mov");
        let c = AssetItem::master_clip("c", "d:/footage/card02/clip.mov");
        assert!(a.same_media_path(&b));
        assert!(!a.same_media_path(&c));
        assert!(!a.same_id(&b));
        assert!(a.same_id(&a));
    }

    #[test]
    fn effective_points_honor_overrides() {
        let mut clip = master_with_range(10.0);
        assert_eq!(clip.effective_in_point(), TickTime::ZERO);
        assert_eq!(clip.effective_out_point(), seconds(10.0));

        clip.custom_in = Some(seconds(2.0));
        clip.custom_out = Some(seconds(8.0));
        assert_eq!(clip.effective_in_point(), seconds(2.0));
        assert_eq!(clip.effective_out_point(), seconds(8.0));
    }

    #[test]
    fn sub_clip_from_marker_spans_marker_range() {
        let rate = Rational::FPS_25;
        let parent = master_with_range(120.0);

        let mut marker = Marker::new("Subclip");
        marker.name = "Goal".into();
        marker
            .set_range(
                TickTime::from_frames(50, rate),
                TickTime::from_frames(25, rate),
            )
            .unwrap();

        let child = AssetItem::sub_clip_from_marker(&parent, &marker).unwrap();
        assert_eq!(child.name, "Goal");
        assert_eq!(child.in_point, TickTime::from_frames(50, rate));
        assert_eq!(child.out_point, TickTime::from_frames(75, rate));

        let nameless = Marker::new("Comment");
        let fallback = AssetItem::sub_clip_from_marker(&parent, &nameless).unwrap();
        assert_eq!(fallback.name, "Comment");
    }
}
