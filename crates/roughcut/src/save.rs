//! Shared save pipeline for rough cuts and logging clips.
//!
//! One protocol, two payloads: a rough cut saves its document content, a
//! logging clip renders its markers to XMP. A failed attempt goes to the
//! host prompt with retry/discard/cancel. Canceling a failure suppresses
//! prompts on later background saves of the same document; a successful
//! save or a close-time save lifts the suppression.
//!
//! When the stale precheck finds the file changed on disk since it was
//! loaded, marker payloads are merged with the on-disk markers and the
//! save proceeds; document payloads cannot be merged, so staleness is
//! reported as a failure instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use lc_library::{AssetItem, AssetMediaInfo, MediaInfoRegistry};
use lc_marker::MarkerTypeRegistry;
use lc_xmp::{build_xmp_from_markers, merge_temporal_markers};
use tracing::{debug, info, warn};

use crate::content;
use crate::error::{RoughCutResult, SaveError};
use crate::host::{FailureChoice, MediaStore, SavePrompt, UndoHost};
use crate::logging_clip::LoggingClipHandle;
use crate::model::{RoughCutHandle, SaveState};

/// How a save was initiated.
#[derive(Clone, Copy, Debug, Default)]
pub struct SaveRequest {
    /// Background save with no user gesture behind it. Skipped past the
    /// prompt when the user already canceled a failure for this document.
    pub silent: bool,
    /// Save on document close or application exit. Clears the prompt
    /// suppression so the user gets one final say.
    pub close_or_exit: bool,
}

/// What a save call amounted to.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    /// The document had nothing to write.
    NotDirty,
    /// The user canceled the failure prompt, or a nested save was refused.
    Canceled,
    /// The user chose to drop the pending edits instead of saving them.
    Discarded,
    /// The save failed without a prompt (suppressed silent save).
    Failed(SaveError),
}

/// Re-entrancy guard, one flag per document kind. A save arriving while
/// another save of the same kind is still on the stack is refused up
/// front; the document mutexes are not re-entrant, so proceeding would
/// deadlock inside the prompt.
#[derive(Debug, Default)]
pub struct SaveLatch {
    logging_clip: AtomicBool,
    rough_cut: AtomicBool,
}

impl SaveLatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn acquire(flag: &AtomicBool) -> Option<LatchGuard<'_>> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| LatchGuard { flag })
    }

    pub(crate) fn acquire_logging_clip(&self) -> Option<LatchGuard<'_>> {
        Self::acquire(&self.logging_clip)
    }

    pub(crate) fn acquire_rough_cut(&self) -> Option<LatchGuard<'_>> {
        Self::acquire(&self.rough_cut)
    }
}

pub(crate) struct LatchGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Host services a save needs, borrowed for the duration of the call.
pub struct SaveContext<'a> {
    pub store: &'a dyn MediaStore,
    pub registry: &'a mut MediaInfoRegistry,
    pub undo: &'a mut dyn UndoHost,
    pub prompt: &'a dyn SavePrompt,
    pub latch: &'a SaveLatch,
}

enum SavePayload {
    /// Marker XMP text; merged with on-disk markers when the file is stale.
    MarkerXmp(String),
    /// Opaque document bytes; staleness is a failure for these.
    Content(Vec<u8>),
}

struct SaveDoc {
    path: String,
    payload: SavePayload,
}

/// What one successful attempt put on disk.
struct WrittenFiles {
    xmp: Option<String>,
    content: Option<Vec<u8>>,
    modified: Option<SystemTime>,
}

/// Saves a rough-cut document to its file.
pub fn save_rough_cut(
    cut: &RoughCutHandle,
    ctx: &mut SaveContext<'_>,
    request: &SaveRequest,
) -> RoughCutResult<SaveOutcome> {
    let Some(_latch) = ctx.latch.acquire_rough_cut() else {
        info!("refusing rough-cut save while another is in progress");
        return Ok(SaveOutcome::Canceled);
    };
    let mut guard = cut.lock();
    let inner = &mut *guard;
    if !inner.state.needs_save() {
        return Ok(SaveOutcome::NotDirty);
    }
    let clips: Vec<AssetItem> = inner.clip_items.iter().map(|c| c.asset.clone()).collect();
    let text = content::build_rough_cut_content(&inner.asset, &clips)?;
    let doc = SaveDoc {
        path: inner.asset.media_path.clone(),
        payload: SavePayload::Content(text.into_bytes()),
    };
    run_save(
        ctx,
        request,
        doc,
        &mut inner.state,
        &mut inner.user_canceled_save_failure,
        &mut inner.undo_count_after_save,
    )
}

/// Saves a logging clip's markers as XMP into its media file's metadata.
pub fn save_logging_clip(
    clip: &LoggingClipHandle,
    types: &MarkerTypeRegistry,
    ctx: &mut SaveContext<'_>,
    request: &SaveRequest,
) -> RoughCutResult<SaveOutcome> {
    let Some(_latch) = ctx.latch.acquire_logging_clip() else {
        info!("refusing logging-clip save while another is in progress");
        return Ok(SaveOutcome::Canceled);
    };
    let mut guard = clip.lock();
    let inner = &mut *guard;
    if !inner.state.needs_save() {
        return Ok(SaveOutcome::NotDirty);
    }
    let xmp = build_xmp_from_markers(&inner.tracks, types, inner.frame_rate)?;
    let doc = SaveDoc {
        path: inner.asset.media_path.clone(),
        payload: SavePayload::MarkerXmp(xmp),
    };
    run_save(
        ctx,
        request,
        doc,
        &mut inner.state,
        &mut inner.user_canceled_save_failure,
        &mut inner.undo_count_after_save,
    )
}

fn run_save(
    ctx: &mut SaveContext<'_>,
    request: &SaveRequest,
    mut doc: SaveDoc,
    state: &mut SaveState,
    user_canceled: &mut bool,
    undo_baseline: &mut usize,
) -> RoughCutResult<SaveOutcome> {
    if request.close_or_exit {
        *user_canceled = false;
    }
    info!(path = %doc.path, silent = request.silent, "saving document");
    *state = SaveState::Saving;

    let outcome = loop {
        match attempt_save(ctx, &mut doc)? {
            Ok(saved) => {
                let base = ctx
                    .registry
                    .get(&doc.path)
                    .map(|prev| (*prev).clone())
                    .unwrap_or_else(|| AssetMediaInfo::new(&doc.path));
                ctx.registry.register(AssetMediaInfo::with_saved_content(
                    &base,
                    saved.xmp,
                    saved.content,
                    saved.modified,
                ));
                *undo_baseline = ctx.undo.undoable_action_count();
                *user_canceled = false;
                break SaveOutcome::Saved;
            }
            Err(failure) => {
                warn!(path = %doc.path, error = %failure, "save attempt failed");
                if request.silent && *user_canceled {
                    break SaveOutcome::Failed(failure);
                }
                match ctx.prompt.present_failure(&failure, true) {
                    FailureChoice::Retry => continue,
                    FailureChoice::Cancel => {
                        *user_canceled = true;
                        break SaveOutcome::Canceled;
                    }
                    FailureChoice::Discard => {
                        discard_pending_edits(ctx.undo, *undo_baseline);
                        break SaveOutcome::Discarded;
                    }
                }
            }
        }
    };

    match &outcome {
        SaveOutcome::Saved => {
            *state = SaveState::Clean;
            info!(path = %doc.path, "document saved");
        }
        SaveOutcome::Discarded => {
            *state = SaveState::Clean;
            info!(path = %doc.path, "pending edits discarded");
        }
        _ => {
            *state = SaveState::SaveFailed;
        }
    }
    Ok(outcome)
}

/// One write attempt. The outer error means the payload could not be
/// produced or merged at all; the inner one is an environmental failure
/// the user can act on through the prompt.
fn attempt_save(
    ctx: &mut SaveContext<'_>,
    doc: &mut SaveDoc,
) -> RoughCutResult<Result<WrittenFiles, SaveError>> {
    let store = ctx.store;
    if !store.exists(&doc.path) {
        if let Err(e) = store.create_placeholder(&doc.path) {
            debug!(path = %doc.path, error = %e, "placeholder creation failed");
            return Ok(Err(SaveError::Offline {
                path: doc.path.clone(),
            }));
        }
        info!(path = %doc.path, "created placeholder for first save");
    }
    if !store.is_writable(&doc.path) {
        return Ok(Err(SaveError::ReadOnly {
            path: doc.path.clone(),
        }));
    }

    let stale = match ctx.registry.get(&doc.path) {
        Some(prev) if prev.needs_save_precheck => {
            match (prev.modified, store.modified_time(&doc.path)) {
                (Some(snapshot), Ok(on_disk)) => on_disk > snapshot,
                _ => false,
            }
        }
        _ => false,
    };
    if stale {
        match &mut doc.payload {
            SavePayload::MarkerXmp(session) => {
                let disk = match store.read(&doc.path) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return Ok(Err(SaveError::Io {
                            path: doc.path.clone(),
                            source: e,
                        }))
                    }
                };
                let merged = merge_temporal_markers(session, &String::from_utf8_lossy(&disk))?;
                info!(path = %doc.path, "merged on-disk marker changes before save");
                *session = merged;
            }
            SavePayload::Content(_) => {
                return Ok(Err(SaveError::StaleMetadata {
                    path: doc.path.clone(),
                }));
            }
        }
    }

    let bytes: &[u8] = match &doc.payload {
        SavePayload::MarkerXmp(text) => text.as_bytes(),
        SavePayload::Content(content) => content,
    };
    if let Err(e) = store.write(&doc.path, bytes) {
        return Ok(Err(SaveError::Io {
            path: doc.path.clone(),
            source: e,
        }));
    }
    let modified = store.modified_time(&doc.path).ok();
    let (xmp, content) = match &doc.payload {
        SavePayload::MarkerXmp(text) => (Some(text.clone()), None),
        SavePayload::Content(content) => (None, Some(content.clone())),
    };
    Ok(Ok(WrittenFiles {
        xmp,
        content,
        modified,
    }))
}

/// Replays undo or redo until the stack is back at the last-saved count.
fn discard_pending_edits(undo: &mut dyn UndoHost, baseline: usize) {
    loop {
        let current = undo.undoable_action_count();
        if current == baseline {
            break;
        }
        let stepped = if current > baseline {
            undo.undo_step()
        } else {
            undo.redo_step()
        };
        if !stepped {
            warn!(current, baseline, "undo host refused a step while discarding edits");
            break;
        }
        if undo.undoable_action_count() == current {
            warn!(current, "undo host made no progress while discarding edits");
            break;
        }
    }
}
