//! Host crossings -- the traits an embedding application implements.
//!
//! The engine never talks to a timeline, undo stack, prompt, or filesystem
//! directly; everything goes through these seams so the save pipeline and
//! change detection can be exercised with in-memory fakes.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use lc_common::TickTime;
use lc_library::{AssetItem, TrackTransitionMap};
use tracing::error;

use crate::error::{RoughCutResult, SaveError};

/// Opaque identity of one item in the host's sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TrackItemId(pub u64);

/// Position snapshot of one sequence item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackItemInfo {
    pub id: TrackItemId,
    pub in_point: TickTime,
    pub duration: TickTime,
}

/// Read-only view of the sequence a rough cut is attached to.
pub trait SequenceView {
    /// Items in timeline order.
    fn track_items(&self) -> Vec<TrackItemInfo>;
    /// Transition maps rebuilt from the live sequence.
    fn video_transitions(&self) -> TrackTransitionMap;
    fn audio_transitions(&self) -> TrackTransitionMap;
}

/// Mutating access to the host's sequence.
pub trait SequenceEditor {
    /// Inserts a clip at the given point and returns the new item's id.
    fn insert_item(&mut self, at: TickTime, asset: &AssetItem) -> RoughCutResult<TrackItemId>;
}

/// The host's undo stack, as far as saves care about it.
pub trait UndoHost {
    fn undoable_action_count(&self) -> usize;
    /// Undoes one step. False when the host refuses.
    fn undo_step(&mut self) -> bool;
    fn redo_step(&mut self) -> bool;
}

/// File access for document and metadata saves.
pub trait MediaStore {
    fn exists(&self, path: &str) -> bool;
    fn is_writable(&self, path: &str) -> bool;
    fn modified_time(&self, path: &str) -> io::Result<SystemTime>;
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()>;
    /// Creates an empty file for a first save. Fails when the location is
    /// unreachable, which the save pipeline reports as offline.
    fn create_placeholder(&self, path: &str) -> io::Result<()>;
}

/// What the user picked when shown a save failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureChoice {
    Retry,
    Discard,
    Cancel,
}

/// Presents a save failure to the user.
pub trait SavePrompt {
    fn present_failure(&self, failure: &SaveError, allow_discard: bool) -> FailureChoice;
}

/// [`MediaStore`] over the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiskStore;

impl MediaStore for DiskStore {
    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn is_writable(&self, path: &str) -> bool {
        match fs::metadata(path) {
            Ok(meta) => !meta.permissions().readonly(),
            Err(_) => false,
        }
    }

    fn modified_time(&self, path: &str) -> io::Result<SystemTime> {
        fs::metadata(path)?.modified()
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        atomic_write(Path::new(path), bytes)
    }

    fn create_placeholder(&self, path: &str) -> io::Result<()> {
        // No create_dir_all here: a missing parent directory means the
        // volume is gone, not that we should invent one.
        fs::write(path, b"")
    }
}

/// Writes via a temp file in the same directory, then renames over the
/// target so readers never observe a half-written document.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_path_for(path);
    if let Err(e) = fs::write(&tmp, bytes) {
        error!(path = %tmp.display(), error = %e, "Failed to write temp file");
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp, path) {
        error!(path = %path.display(), error = %e, "Failed to replace file");
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("document"));
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_common::Guid;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lc_store_{tag}_{}", Guid::generate()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn disk_store_round_trip() {
        let dir = temp_dir("rt");
        let path = dir.join("doc.rcut");
        let path_str = path.to_str().unwrap();

        let store = DiskStore;
        assert!(!store.exists(path_str));
        store.create_placeholder(path_str).unwrap();
        assert!(store.exists(path_str));
        assert!(store.is_writable(path_str));

        store.write(path_str, b"hello").unwrap();
        assert_eq!(store.read(path_str).unwrap(), b"hello");
        assert!(store.modified_time(path_str).is_ok());
        // The temp file from the atomic write must be gone.
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn placeholder_fails_without_parent_directory() {
        let dir = temp_dir("missing");
        let path = dir.join("gone").join("doc.rcut");
        let store = DiskStore;
        assert!(store.create_placeholder(path.to_str().unwrap()).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }
}
