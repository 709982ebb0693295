//! Media-info registry -- single owner of last-persisted truth.
//!
//! Entries are shared out as `Arc` so open documents can hold the snapshot
//! they loaded from while a later save swaps the registry to a successor.
//! Keys are media paths folded to lower case, matching
//! [`crate::AssetItem::same_media_path`].

use std::collections::HashMap;
use std::sync::Arc;

use lc_common::Guid;
use tracing::debug;

use crate::media_info::AssetMediaInfo;

#[derive(Debug, Default)]
pub struct MediaInfoRegistry {
    entries: HashMap<String, Arc<AssetMediaInfo>>,
}

impl MediaInfoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_for(path: &str) -> String {
        path.to_ascii_lowercase()
    }

    /// Inserts or replaces the entry for the info's media path and returns
    /// the shared handle.
    pub fn register(&mut self, info: AssetMediaInfo) -> Arc<AssetMediaInfo> {
        let key = Self::key_for(&info.media_path);
        debug!(path = %info.media_path, "registering media info");
        let entry = Arc::new(info);
        self.entries.insert(key, Arc::clone(&entry));
        entry
    }

    pub fn get(&self, media_path: &str) -> Option<Arc<AssetMediaInfo>> {
        self.entries.get(&Self::key_for(media_path)).cloned()
    }

    /// Lookup by stable id, for callers holding an `AssetItem` rather than
    /// a path.
    pub fn get_by_id(&self, info_id: &Guid) -> Option<Arc<AssetMediaInfo>> {
        self.entries
            .values()
            .find(|info| info.info_id() == info_id)
            .cloned()
    }

    pub fn remove(&mut self, media_path: &str) -> Option<Arc<AssetMediaInfo>> {
        self.entries.remove(&Self::key_for(media_path))
    }

    pub fn contains(&self, media_path: &str) -> bool {
        self.entries.contains_key(&Self::key_for(media_path))
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<AssetMediaInfo>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
