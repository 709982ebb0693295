//! In-memory fakes for the host seams, shared by the unit tests.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use lc_common::TickTime;
use lc_library::{AssetItem, TrackTransitionMap};
use parking_lot::Mutex;

use crate::error::{RoughCutResult, SaveError};
use crate::host::{
    FailureChoice, MediaStore, SavePrompt, SequenceEditor, SequenceView, TrackItemId,
    TrackItemInfo, UndoHost,
};

/// Sequence snapshot the tests can edit directly.
pub(crate) struct FakeSequence {
    pub items: Vec<TrackItemInfo>,
    pub video: TrackTransitionMap,
    pub audio: TrackTransitionMap,
}

impl FakeSequence {
    pub fn new(items: Vec<TrackItemInfo>) -> Self {
        Self {
            items,
            video: TrackTransitionMap::new(),
            audio: TrackTransitionMap::new(),
        }
    }
}

impl SequenceView for FakeSequence {
    fn track_items(&self) -> Vec<TrackItemInfo> {
        self.items.clone()
    }

    fn video_transitions(&self) -> TrackTransitionMap {
        self.video.clone()
    }

    fn audio_transitions(&self) -> TrackTransitionMap {
        self.audio.clone()
    }
}

/// Records insertions and hands out sequential item ids.
pub(crate) struct FakeEditor {
    pub inserted: Vec<(TickTime, String)>,
    next_id: u64,
}

impl FakeEditor {
    pub fn new() -> Self {
        Self {
            inserted: Vec::new(),
            next_id: 1,
        }
    }
}

impl SequenceEditor for FakeEditor {
    fn insert_item(&mut self, at: TickTime, asset: &AssetItem) -> RoughCutResult<TrackItemId> {
        self.inserted.push((at, asset.name.clone()));
        let id = TrackItemId(self.next_id);
        self.next_id += 1;
        Ok(id)
    }
}

/// [`MediaStore`] over a hash map, with switches for the failure modes the
/// save pipeline has to survive. Every write advances a fake clock so
/// modification times are strictly ordered.
#[derive(Default)]
pub(crate) struct MemoryStore {
    files: Mutex<HashMap<String, (Vec<u8>, SystemTime)>>,
    clock: AtomicU64,
    offline: AtomicBool,
    read_only: AtomicBool,
    write_failures: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_time(&self) -> SystemTime {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed) + 1;
        SystemTime::UNIX_EPOCH + Duration::from_secs(tick)
    }

    /// Drops a file in from "outside", with a fresh modification time.
    pub fn set_file(&self, path: &str, bytes: &[u8]) {
        let when = self.next_time();
        self.files.lock().insert(path.into(), (bytes.to_vec(), when));
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().get(path).map(|(bytes, _)| bytes.clone())
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }

    /// The next `count` writes fail with an injected io error.
    pub fn fail_next_writes(&self, count: usize) {
        self.write_failures.store(count, Ordering::Relaxed);
    }

    fn gone(path: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("no such file: {path}"))
    }
}

impl MediaStore for MemoryStore {
    fn exists(&self, path: &str) -> bool {
        !self.offline.load(Ordering::Relaxed) && self.files.lock().contains_key(path)
    }

    fn is_writable(&self, _path: &str) -> bool {
        !self.read_only.load(Ordering::Relaxed)
    }

    fn modified_time(&self, path: &str) -> io::Result<SystemTime> {
        self.files
            .lock()
            .get(path)
            .map(|(_, when)| *when)
            .ok_or_else(|| Self::gone(path))
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(Self::gone(path));
        }
        self.files
            .lock()
            .get(path)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| Self::gone(path))
    }

    fn write(&self, path: &str, bytes: &[u8]) -> io::Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(Self::gone(path));
        }
        if self.read_only.load(Ordering::Relaxed) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("read-only: {path}"),
            ));
        }
        let remaining = self.write_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.write_failures.store(remaining - 1, Ordering::Relaxed);
            return Err(io::Error::other("injected write failure"));
        }
        let when = self.next_time();
        self.files.lock().insert(path.into(), (bytes.to_vec(), when));
        Ok(())
    }

    fn create_placeholder(&self, path: &str) -> io::Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(Self::gone(path));
        }
        let when = self.next_time();
        self.files.lock().insert(path.into(), (Vec::new(), when));
        Ok(())
    }
}

/// Plays back a fixed list of choices, then cancels. Remembers every
/// failure message it was shown.
pub(crate) struct ScriptedPrompt {
    script: Mutex<Vec<FailureChoice>>,
    presented: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(script: &[FailureChoice]) -> Self {
        Self {
            script: Mutex::new(script.to_vec()),
            presented: Mutex::new(Vec::new()),
        }
    }

    pub fn presented_count(&self) -> usize {
        self.presented.lock().len()
    }

    pub fn presented(&self) -> Vec<String> {
        self.presented.lock().clone()
    }
}

impl SavePrompt for ScriptedPrompt {
    fn present_failure(&self, failure: &SaveError, _allow_discard: bool) -> FailureChoice {
        self.presented.lock().push(failure.to_string());
        let mut script = self.script.lock();
        if script.is_empty() {
            FailureChoice::Cancel
        } else {
            script.remove(0)
        }
    }
}

/// Undo stack as a counter.
#[derive(Debug, Default)]
pub(crate) struct FakeUndoHost {
    pub count: usize,
    pub refuse: bool,
    pub undone: usize,
    pub redone: usize,
}

impl UndoHost for FakeUndoHost {
    fn undoable_action_count(&self) -> usize {
        self.count
    }

    fn undo_step(&mut self) -> bool {
        if self.refuse || self.count == 0 {
            return false;
        }
        self.count -= 1;
        self.undone += 1;
        true
    }

    fn redo_step(&mut self) -> bool {
        if self.refuse {
            return false;
        }
        self.count += 1;
        self.redone += 1;
        true
    }
}
