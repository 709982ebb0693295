//! Logging clip -- the marker-editing wrapper around one clip asset.
//!
//! A logging clip pairs a master clip or sub-clip with the marker tracks
//! being edited for it. Saving goes through the same precheck/save/merge
//! protocol as rough cuts (see [`crate::save`]), with the markers rendered
//! to XMP at the moment of the save.

use lc_common::{Guid, Rational};
use lc_library::{AssetItem, AssetKind};
use lc_marker::{Marker, MarkerTracks, MarkerTypeRegistry};
use lc_xmp::build_markers_from_xmp;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{RoughCutError, RoughCutResult};
use crate::host::UndoHost;
use crate::model::SaveState;

/// Mutable logging-clip state behind the handle's mutex.
#[derive(Debug)]
pub(crate) struct LoggingClip {
    pub(crate) asset: AssetItem,
    pub(crate) tracks: MarkerTracks,
    pub(crate) frame_rate: Rational,
    pub(crate) state: SaveState,
    pub(crate) user_canceled_save_failure: bool,
    pub(crate) undo_count_after_save: usize,
}

impl LoggingClip {
    fn mark_dirty(&mut self) {
        if self.state != SaveState::Dirty {
            debug!(clip = %self.asset.name, from = self.state.label(), "logging clip dirty");
            self.state = SaveState::Dirty;
        }
    }
}

/// Shared handle to one logging clip. Public entry points lock the mutex
/// exactly once, same discipline as [`crate::model::RoughCutHandle`].
pub struct LoggingClipHandle {
    inner: Mutex<LoggingClip>,
}

impl LoggingClipHandle {
    /// Opens a clip for marker logging with no existing metadata.
    pub fn open(asset: AssetItem, frame_rate: Rational) -> RoughCutResult<LoggingClipHandle> {
        let clip = build(asset, frame_rate, MarkerTracks::new())?;
        info!(clip = %clip.asset.name, "opened logging clip");
        Ok(LoggingClipHandle {
            inner: Mutex::new(clip),
        })
    }

    /// Opens a clip and decodes its existing marker XMP. Returns the handle
    /// plus whether the packet was malformed and markers were dropped.
    pub fn open_with_xmp(
        asset: AssetItem,
        frame_rate: Rational,
        xmp: &str,
        types: &mut MarkerTypeRegistry,
    ) -> RoughCutResult<(LoggingClipHandle, bool)> {
        let decode = build_markers_from_xmp(xmp, types)?;
        if decode.degraded {
            warn!(clip = %asset.name, note = %decode.note, "existing marker metadata dropped");
        }
        let clip = build(asset, frame_rate, decode.tracks)?;
        info!(clip = %clip.asset.name, markers = clip.tracks.len(), "opened logging clip");
        Ok((
            LoggingClipHandle {
                inner: Mutex::new(clip),
            },
            decode.degraded,
        ))
    }

    pub fn clip_name(&self) -> String {
        self.inner.lock().asset.name.clone()
    }

    pub fn media_path(&self) -> String {
        self.inner.lock().asset.media_path.clone()
    }

    pub fn frame_rate(&self) -> Rational {
        self.inner.lock().frame_rate
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

    pub fn add_marker(&self, marker: Marker) {
        let mut inner = self.inner.lock();
        inner.tracks.add(marker);
        inner.mark_dirty();
    }

    /// Replaces a marker in place, keyed by its id.
    pub fn update_marker(&self, marker: Marker) {
        let mut inner = self.inner.lock();
        inner.tracks.update(marker);
        inner.mark_dirty();
    }

    pub fn remove_marker(&self, id: &Guid) -> Option<Marker> {
        let mut inner = self.inner.lock();
        let removed = inner.tracks.remove(id);
        if removed.is_some() {
            inner.mark_dirty();
        }
        removed
    }

    pub fn marker_count(&self) -> usize {
        self.inner.lock().tracks.len()
    }

    /// Read access to the marker tracks under the lock.
    pub fn with_tracks<R>(&self, f: impl FnOnce(&MarkerTracks) -> R) -> R {
        f(&self.inner.lock().tracks)
    }

    /// Write access to the marker tracks under the lock; the clip is marked
    /// dirty on the assumption that the caller changed something.
    pub fn with_tracks_mut<R>(&self, f: impl FnOnce(&mut MarkerTracks) -> R) -> R {
        let mut inner = self.inner.lock();
        let result = f(&mut inner.tracks);
        inner.mark_dirty();
        result
    }

    /// Re-baselines the discard snapshot after the host cleared its stack.
    pub fn on_undo_stack_cleared(&self, undo: &dyn UndoHost) {
        let mut inner = self.inner.lock();
        inner.undo_count_after_save = undo.undoable_action_count();
        debug!(clip = %inner.asset.name, count = inner.undo_count_after_save, "undo baseline reset");
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, LoggingClip> {
        self.inner.lock()
    }
}

fn build(
    asset: AssetItem,
    frame_rate: Rational,
    tracks: MarkerTracks,
) -> RoughCutResult<LoggingClip> {
    if !matches!(asset.kind(), AssetKind::MasterClip | AssetKind::SubClip) {
        return Err(RoughCutError::UnsupportedClipKind(asset.kind()));
    }
    Ok(LoggingClip {
        asset,
        tracks,
        frame_rate,
        state: SaveState::Clean,
        user_canceled_save_failure: false,
        undo_count_after_save: 0,
    })
}
