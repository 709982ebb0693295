//! Per-media metadata snapshots.
//!
//! An [`AssetMediaInfo`] records what was last read from or written to one
//! media file: its raw XMP, document payload, and on-disk timestamps. It is
//! immutable once registered; saves build a successor with
//! [`AssetMediaInfo::with_saved_content`] and swap it into the registry.

use std::time::SystemTime;

use lc_common::{Guid, Rational};

/// Last-persisted metadata for one media file.
#[derive(Clone, Debug)]
pub struct AssetMediaInfo {
    pub media_path: String,
    info_id: Guid,
    /// Raw XMP packet text, if the file carries one.
    pub xmp: Option<String>,
    /// Opaque application metadata stored alongside the XMP.
    pub custom_metadata: Option<String>,
    /// Document payload for file-backed assets such as rough cuts.
    pub file_content: Option<Vec<u8>>,
    pub created: Option<SystemTime>,
    /// On-disk modification time at the last read or write. Saves compare
    /// this against the live file to detect out-of-band edits.
    pub modified: Option<SystemTime>,
    pub frame_rate: Option<Rational>,
    /// User-facing alias; empty means "derive from the path".
    pub alias_name: String,
    /// Gates the stale-file comparison before a save.
    pub needs_save_precheck: bool,
    /// Forces reads through the local path even when a proxy exists.
    pub force_local_load: bool,
}

impl AssetMediaInfo {
    pub fn new(media_path: impl Into<String>) -> AssetMediaInfo {
        AssetMediaInfo {
            media_path: media_path.into(),
            info_id: Guid::generate(),
            xmp: None,
            custom_metadata: None,
            file_content: None,
            created: None,
            modified: None,
            frame_rate: None,
            alias_name: String::new(),
            needs_save_precheck: true,
            force_local_load: false,
        }
    }

    /// Successor snapshot after a save. Identity and descriptive fields
    /// carry over from `prev`; the persisted payload and the modification
    /// time are replaced. Without a recorded time there is nothing to
    /// stale-check against, so the precheck flag follows `modified`.
    pub fn with_saved_content(
        prev: &AssetMediaInfo,
        xmp: Option<String>,
        file_content: Option<Vec<u8>>,
        modified: Option<SystemTime>,
    ) -> AssetMediaInfo {
        AssetMediaInfo {
            media_path: prev.media_path.clone(),
            info_id: prev.info_id.clone(),
            xmp,
            custom_metadata: prev.custom_metadata.clone(),
            file_content,
            created: prev.created,
            modified,
            frame_rate: prev.frame_rate,
            alias_name: prev.alias_name.clone(),
            needs_save_precheck: modified.is_some(),
            force_local_load: prev.force_local_load,
        }
    }

    /// Stable identity, independent of path casing or renames.
    pub fn info_id(&self) -> &Guid {
        &self.info_id
    }
}
