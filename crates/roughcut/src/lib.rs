//! `lc-roughcut` -- rough-cut documents, logging clips, and the metadata
//! save pipeline.
//!
//! - [`model`]: the rough-cut document, its clip items, and change
//!   detection against the host sequence.
//! - [`logging_clip`]: the marker-editing wrapper around one clip asset.
//! - [`content`]: the `.rcut` document format and its sidecar settings.
//! - [`save`]: the shared save pipeline -- placeholder creation, stale
//!   prechecks, marker merging, and failure prompts.
//! - [`host`]: the traits an embedding application implements.

pub mod content;
pub mod error;
pub mod host;
pub mod logging_clip;
pub mod model;
pub mod save;

mod detect;

#[cfg(test)]
mod testutil;

pub use content::{
    build_rough_cut_content, is_rough_cut_file_extension, load_rough_cut, load_rough_cut_file,
    load_sidecar_settings, save_rough_cut_file, save_sidecar_settings, sidecar_path,
    LoadedRoughCut, SidecarSettings, ROUGH_CUT_CONTENT_VERSION, ROUGH_CUT_EXTENSION,
};
pub use error::{RoughCutError, RoughCutResult, SaveError};
pub use host::{
    DiskStore, FailureChoice, MediaStore, SavePrompt, SequenceEditor, SequenceView, TrackItemId,
    TrackItemInfo, UndoHost,
};
pub use logging_clip::LoggingClipHandle;
pub use model::{RcClipItem, RoughCutHandle, SaveState};
pub use save::{
    save_logging_clip, save_rough_cut, SaveContext, SaveLatch, SaveOutcome, SaveRequest,
};
