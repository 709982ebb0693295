//! Rough-cut document model and its save-state machine.

use lc_common::TickTime;
use lc_library::{AssetItem, AssetKind};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::content::LoadedRoughCut;
use crate::detect;
use crate::error::{RoughCutError, RoughCutResult};
use crate::host::{SequenceEditor, SequenceView, TrackItemId, UndoHost};

/// Where a document sits in its save lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveState {
    Clean,
    Dirty,
    Saving,
    SaveFailed,
}

impl SaveState {
    pub fn label(self) -> &'static str {
        match self {
            SaveState::Clean => "clean",
            SaveState::Dirty => "dirty",
            SaveState::Saving => "saving",
            SaveState::SaveFailed => "save failed",
        }
    }

    /// True when the document holds edits that are not on disk.
    pub fn needs_save(self) -> bool {
        matches!(self, SaveState::Dirty | SaveState::SaveFailed)
    }
}

/// One clip reference inside a rough cut, with the sequence item it is
/// currently realized as when attached.
#[derive(Clone, Debug)]
pub struct RcClipItem {
    pub asset: AssetItem,
    pub track_item: Option<TrackItemId>,
}

impl RcClipItem {
    pub fn new(asset: AssetItem) -> Self {
        Self {
            asset,
            track_item: None,
        }
    }
}

/// Mutable rough-cut state. Lives behind the handle's mutex; everything in
/// here assumes the lock is already held.
#[derive(Debug)]
pub(crate) struct RoughCut {
    pub(crate) asset: AssetItem,
    pub(crate) clip_items: Vec<RcClipItem>,
    /// Items the sequence no longer has, kept so an undo can restore them.
    pub(crate) trash: Vec<RcClipItem>,
    pub(crate) state: SaveState,
    pub(crate) attached: bool,
    pub(crate) user_canceled_save_failure: bool,
    pub(crate) undo_count_after_save: usize,
}

impl RoughCut {
    pub(crate) fn mark_dirty(&mut self) {
        if self.state != SaveState::Dirty {
            debug!(cut = %self.asset.name, from = self.state.label(), "rough cut dirty");
            self.state = SaveState::Dirty;
        }
    }
}

/// Shared handle to one rough-cut document.
///
/// Public entry points lock the mutex exactly once and then work through
/// private helpers; no public method calls another public method.
pub struct RoughCutHandle {
    inner: Mutex<RoughCut>,
}

impl RoughCutHandle {
    /// New, unsaved rough cut. `document_path` may be empty until the host
    /// picks a location.
    pub fn new(name: impl Into<String>, document_path: impl Into<String>) -> Self {
        let asset = AssetItem::rough_cut(name, document_path);
        info!(cut = %asset.name, "created rough cut");
        Self {
            inner: Mutex::new(RoughCut {
                asset,
                clip_items: Vec::new(),
                trash: Vec::new(),
                state: SaveState::Dirty,
                attached: false,
                user_canceled_save_failure: false,
                undo_count_after_save: 0,
            }),
        }
    }

    /// Rebuilds a handle from a loaded document, keeping persisted identity.
    pub fn from_loaded(document_path: impl Into<String>, loaded: LoadedRoughCut) -> Self {
        let mut asset =
            AssetItem::with_id(AssetKind::RoughCut, loaded.id, loaded.name, document_path);
        asset.video_transitions = loaded.video_transitions;
        asset.audio_transitions = loaded.audio_transitions;
        let clip_items: Vec<RcClipItem> = loaded.clips.into_iter().map(RcClipItem::new).collect();
        info!(cut = %asset.name, clips = clip_items.len(), "loaded rough cut");
        Self {
            inner: Mutex::new(RoughCut {
                asset,
                clip_items,
                trash: Vec::new(),
                state: SaveState::Clean,
                attached: false,
                user_canceled_save_failure: false,
                undo_count_after_save: 0,
            }),
        }
    }

    pub fn name(&self) -> String {
        self.inner.lock().asset.name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.asset.name = name.into();
        inner.mark_dirty();
    }

    pub fn document_path(&self) -> String {
        self.inner.lock().asset.media_path.clone()
    }

    /// Points the document at a new file, e.g. after a save-as.
    pub fn set_document_path(&self, path: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.asset.media_path = path.into();
        inner.mark_dirty();
    }

    pub fn save_state(&self) -> SaveState {
        self.inner.lock().state
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.lock().state.needs_save()
    }

    pub fn mark_dirty(&self) {
        self.inner.lock().mark_dirty();
    }

    pub fn is_attached(&self) -> bool {
        self.inner.lock().attached
    }

    pub fn set_attached(&self, attached: bool) {
        let mut inner = self.inner.lock();
        if inner.attached != attached {
            debug!(cut = %inner.asset.name, attached, "rough cut attachment changed");
            inner.attached = attached;
        }
    }

    /// Snapshot of the underlying rough-cut asset, transitions included.
    pub fn asset(&self) -> AssetItem {
        self.inner.lock().asset.clone()
    }

    /// Appends a clip. Only master clips and sub-clips can be cut in.
    pub fn add_clip(&self, asset: AssetItem) -> RoughCutResult<()> {
        let mut inner = self.inner.lock();
        if !matches!(asset.kind(), AssetKind::MasterClip | AssetKind::SubClip) {
            return Err(RoughCutError::UnsupportedClipKind(asset.kind()));
        }
        debug!(cut = %inner.asset.name, clip = %asset.name, "adding clip");
        inner.clip_items.push(RcClipItem::new(asset));
        inner.mark_dirty();
        Ok(())
    }

    pub fn clip_assets(&self) -> Vec<AssetItem> {
        self.inner
            .lock()
            .clip_items
            .iter()
            .map(|c| c.asset.clone())
            .collect()
    }

    pub fn clip_count(&self) -> usize {
        self.inner.lock().clip_items.len()
    }

    pub fn trash_count(&self) -> usize {
        self.inner.lock().trash.len()
    }

    /// True when the attached sequence no longer matches the stored items.
    /// Neither side is mutated.
    pub fn test_if_changed(&self, view: &dyn SequenceView) -> bool {
        let inner = self.inner.lock();
        detect::is_structurally_changed(&inner, view)
    }

    /// Re-syncs stored clip items from the sequence. Unmatched items move to
    /// the trash list; transition maps are replaced by the rebuilt ones.
    pub fn reset_clip_items_from_sequence(&self, view: &dyn SequenceView) {
        let mut inner = self.inner.lock();
        detect::resync_from_sequence(&mut inner, view);
    }

    /// Inserts every clip item at `at`, iterating in reverse so one fixed
    /// insertion point yields timeline order, and records the returned
    /// track-item ids. Marks the cut attached.
    pub fn apply_to_sequence(
        &self,
        editor: &mut dyn SequenceEditor,
        at: TickTime,
    ) -> RoughCutResult<Vec<TrackItemId>> {
        let mut inner = self.inner.lock();
        let mut ids = Vec::with_capacity(inner.clip_items.len());
        for item in inner.clip_items.iter_mut().rev() {
            let id = editor.insert_item(at, &item.asset)?;
            item.track_item = Some(id);
            ids.push(id);
        }
        ids.reverse();
        inner.attached = true;
        info!(cut = %inner.asset.name, items = ids.len(), "sent rough cut to sequence");
        Ok(ids)
    }

    /// Re-baselines the discard snapshot after the host cleared its stack.
    pub fn on_undo_stack_cleared(&self, undo: &dyn UndoHost) {
        let mut inner = self.inner.lock();
        inner.undo_count_after_save = undo.undoable_action_count();
        debug!(cut = %inner.asset.name, count = inner.undo_count_after_save, "undo baseline reset");
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RoughCut> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeEditor;

    fn clip(name: &str, in_secs: f64, out_secs: f64) -> AssetItem {
        let mut item = AssetItem::master_clip(name, format!("d:/media/{name}.mov"));
        item.in_point = TickTime::from_seconds(in_secs);
        item.out_point = TickTime::from_seconds(out_secs);
        item
    }

    #[test]
    fn new_cut_starts_dirty_and_loaded_cut_clean() {
        let fresh = RoughCutHandle::new("Selects", "");
        assert_eq!(fresh.save_state(), SaveState::Dirty);
        assert!(fresh.is_dirty());

        let loaded = RoughCutHandle::from_loaded("d:/cuts/a.rcut", LoadedRoughCut::default());
        assert_eq!(loaded.save_state(), SaveState::Clean);
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn add_clip_rejects_rough_cut_kinds() {
        let cut = RoughCutHandle::new("Selects", "");
        let nested = AssetItem::rough_cut("inner", "");
        assert!(matches!(
            cut.add_clip(nested),
            Err(RoughCutError::UnsupportedClipKind(AssetKind::RoughCut))
        ));
        cut.add_clip(clip("a", 0.0, 1.0)).unwrap();
        assert_eq!(cut.clip_count(), 1);
    }

    #[test]
    fn renaming_marks_dirty() {
        let cut = RoughCutHandle::from_loaded("d:/cuts/a.rcut", LoadedRoughCut::default());
        assert!(!cut.is_dirty());
        cut.set_name("Selects v2");
        assert_eq!(cut.save_state(), SaveState::Dirty);
        assert_eq!(cut.name(), "Selects v2");
    }

    #[test]
    fn apply_to_sequence_inserts_in_reverse_and_records_ids() {
        let cut = RoughCutHandle::new("Selects", "");
        cut.add_clip(clip("first", 0.0, 2.0)).unwrap();
        cut.add_clip(clip("second", 0.0, 3.0)).unwrap();
        cut.add_clip(clip("third", 0.0, 1.0)).unwrap();

        let mut editor = FakeEditor::new();
        let at = TickTime::from_seconds(10.0);
        let ids = cut.apply_to_sequence(&mut editor, at).unwrap();

        let order: Vec<&str> = editor.inserted.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(order, vec!["third", "second", "first"]);
        assert!(editor.inserted.iter().all(|(p, _)| *p == at));

        assert_eq!(ids.len(), 3);
        let recorded: Vec<Option<TrackItemId>> = cut
            .lock()
            .clip_items
            .iter()
            .map(|c| c.track_item)
            .collect();
        assert_eq!(recorded, vec![Some(ids[0]), Some(ids[1]), Some(ids[2])]);
        assert!(cut.is_attached());
    }

    #[test]
    fn save_state_labels() {
        assert_eq!(SaveState::Clean.label(), "clean");
        assert_eq!(SaveState::SaveFailed.label(), "save failed");
        assert!(SaveState::SaveFailed.needs_save());
        assert!(!SaveState::Saving.needs_save());
    }
}
