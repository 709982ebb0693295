//! Marker template sets -- named, persisted collections of marker presets.
//!
//! An explicit registry object with an `initialize`/`shutdown` lifecycle.
//! Three kinds of set exist: the computed read-only "Default" set (one
//! template per registered marker type), the mutable "Custom" scratch set
//! persisted at a fixed filename, and user-saved named sets stored one per
//! GUID-named file. Editing any read-only set forks it into "Custom" first;
//! the fork is required behavior, not an optimization.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crossbeam::channel::{self, Receiver, Sender};
use lc_common::Guid;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MarkerError, MarkerResult};
use crate::marker::Marker;
use crate::registry::MarkerTypeRegistry;
use crate::tracks::MarkerSet;

/// Name of the computed read-only set.
pub const DEFAULT_SET_NAME: &str = "Default";

/// Name of the mutable scratch set.
pub const CUSTOM_SET_NAME: &str = "Custom";

/// Extension identifying saved template set files.
pub const TEMPLATE_SET_EXTENSION: &str = "markertemplateset";

/// Fixed filename of the scratch set in the settings directory.
pub const SCRATCH_SET_FILE: &str = "unsaved.markertemplateset";

const TEMPLATE_SET_FILE_VERSION: u32 = 1;

/// Where template sets live on disk. Injectable so tests never touch the
/// real user directories.
#[derive(Clone, Debug)]
pub struct TemplateSetPaths {
    /// Directory scanned for user-saved `.markertemplateset` files.
    pub saved_sets_dir: PathBuf,
    /// Full path of the scratch "Custom" set file.
    pub scratch_file: PathBuf,
}

impl TemplateSetPaths {
    pub fn new(saved_sets_dir: impl Into<PathBuf>, scratch_file: impl Into<PathBuf>) -> Self {
        Self {
            saved_sets_dir: saved_sets_dir.into(),
            scratch_file: scratch_file.into(),
        }
    }

    /// Platform defaults: saved sets in a documents subdirectory, the
    /// scratch set in the settings directory.
    pub fn default_locations(product_dir: &str) -> Option<Self> {
        let documents = dirs_next::document_dir()?;
        let settings = dirs_next::config_dir()?;
        Some(Self {
            saved_sets_dir: documents.join(product_dir).join("Marker Template Sets"),
            scratch_file: settings.join(product_dir).join(SCRATCH_SET_FILE),
        })
    }
}

/// Change notifications published to subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateSetEvent {
    /// A set was added, removed, or forked.
    SetListChanged,
    /// The current set selection moved.
    CurrentSetChanged,
    /// Templates inside the current set changed.
    SetContentChanged,
}

/// On-disk document for one saved set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSetFile {
    version: u32,
    name: String,
    markers: Vec<Marker>,
}

/// Registry of marker template sets.
pub struct TemplateSets {
    current: String,
    sets: Vec<MarkerSet>,
    set_files: HashMap<String, PathBuf>,
    paths: TemplateSetPaths,
    subscribers: Vec<Sender<TemplateSetEvent>>,
}

impl TemplateSets {
    /// Builds the registry: computes the default set from the marker type
    /// registry, loads the scratch custom set if present, and discovers
    /// user-saved sets by extension scan. Unreadable set files are skipped
    /// with a warning rather than failing initialization.
    pub fn initialize(
        paths: TemplateSetPaths,
        registry: &MarkerTypeRegistry,
    ) -> MarkerResult<Self> {
        let mut default_set = MarkerSet::new(DEFAULT_SET_NAME);
        for def in registry.iter() {
            let mut template = Marker::new(def.name.clone());
            template.name = def.label.clone();
            default_set.push(template);
        }

        let mut sets = vec![default_set];
        let mut current = DEFAULT_SET_NAME.to_string();

        if paths.scratch_file.exists() {
            match load_set_file(&paths.scratch_file) {
                Ok(file) => {
                    sets.push(MarkerSet::with_markers(CUSTOM_SET_NAME, file.markers));
                    current = CUSTOM_SET_NAME.to_string();
                }
                Err(e) => {
                    warn!(
                        path = %paths.scratch_file.display(),
                        error = %e,
                        "Failed to load scratch template set, starting fresh"
                    );
                }
            }
        }

        let mut set_files = HashMap::new();
        for path in scan_set_files(&paths.saved_sets_dir) {
            match load_set_file(&path) {
                Ok(file) => {
                    let name = file.name;
                    if name == DEFAULT_SET_NAME
                        || name == CUSTOM_SET_NAME
                        || set_files.contains_key(&name)
                    {
                        warn!(
                            path = %path.display(),
                            name = %name,
                            "Skipping template set with conflicting name"
                        );
                        continue;
                    }
                    sets.push(MarkerSet::with_markers(name.clone(), file.markers));
                    set_files.insert(name, path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable template set");
                }
            }
        }

        info!(
            sets = sets.len(),
            current = %current,
            "Initialized marker template sets"
        );
        Ok(Self {
            current,
            sets,
            set_files,
            paths,
            subscribers: Vec::new(),
        })
    }

    /// Persists the scratch custom set (or deletes its file when the set is
    /// empty or gone) and disconnects all subscribers.
    pub fn shutdown(&mut self) -> MarkerResult<()> {
        match self.sets.iter().find(|s| s.name == CUSTOM_SET_NAME) {
            Some(custom) if !custom.is_empty() => {
                let file = TemplateSetFile {
                    version: TEMPLATE_SET_FILE_VERSION,
                    name: CUSTOM_SET_NAME.to_string(),
                    markers: custom.markers().to_vec(),
                };
                write_set_file(&self.paths.scratch_file, &file)?;
            }
            _ => {
                if let Err(e) = std::fs::remove_file(&self.paths.scratch_file) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        return Err(MarkerError::Io(e));
                    }
                }
            }
        }
        self.subscribers.clear();
        info!("Shut down marker template sets");
        Ok(())
    }

    // --- queries ---

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn current_set(&self) -> &MarkerSet {
        self.sets
            .iter()
            .find(|s| s.name == self.current)
            .unwrap_or(&self.sets[0])
    }

    pub fn set(&self, name: &str) -> Option<&MarkerSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    /// Set names in listing order: Default, then Custom if present, then
    /// saved sets in discovery order.
    pub fn set_names(&self) -> Vec<&str> {
        self.sets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Only the scratch custom set is editable in place; everything else
    /// forks on write.
    pub fn is_read_only(&self, name: &str) -> bool {
        name != CUSTOM_SET_NAME
    }

    pub fn make_current(&mut self, name: &str) -> MarkerResult<()> {
        if self.set(name).is_none() {
            return Err(MarkerError::UnknownTemplateSet {
                name: name.to_string(),
            });
        }
        if self.current != name {
            self.current = name.to_string();
            self.publish(TemplateSetEvent::CurrentSetChanged);
        }
        Ok(())
    }

    /// Registers a change listener. Receivers are disconnected at shutdown.
    pub fn subscribe(&mut self) -> Receiver<TemplateSetEvent> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    // --- mutations (all fork-on-write) ---

    /// Appends a marker to the current set as a template.
    pub fn save_marker_to_current(&mut self, marker: Marker) -> MarkerResult<()> {
        self.fork_if_read_only();
        self.current_set_mut().push(marker);
        self.publish(TemplateSetEvent::SetContentChanged);
        Ok(())
    }

    pub fn delete_marker_from_current(&mut self, index: usize) -> MarkerResult<()> {
        self.fork_if_read_only();
        let set = self.current_set_mut();
        let len = set.len();
        if set.remove(index).is_none() {
            return Err(MarkerError::TemplateIndexOutOfRange { index, len });
        }
        self.publish(TemplateSetEvent::SetContentChanged);
        Ok(())
    }

    pub fn move_marker_in_current(&mut self, from: usize, to: usize) -> MarkerResult<()> {
        self.fork_if_read_only();
        let set = self.current_set_mut();
        let len = set.len();
        if !set.move_marker(from, to) {
            return Err(MarkerError::TemplateIndexOutOfRange {
                index: from.max(to),
                len,
            });
        }
        self.publish(TemplateSetEvent::SetContentChanged);
        Ok(())
    }

    /// Stamps a new marker from the template at `index` in the current set:
    /// fresh marker id, fresh tag instance ids.
    pub fn new_marker_from_current(&self, index: usize) -> MarkerResult<Marker> {
        let set = self.current_set();
        let template = set
            .get(index)
            .ok_or(MarkerError::TemplateIndexOutOfRange {
                index,
                len: set.len(),
            })?;
        Ok(Marker::from_template(template))
    }

    /// Persists the current working set under a caller-chosen name.
    ///
    /// Fails with [`MarkerError::TemplateSetExists`] when a set of that name
    /// is already saved and `force_overwrite` is false. Overwriting keeps
    /// the existing GUID-named file.
    pub fn save_custom_set(&mut self, name: &str, force_overwrite: bool) -> MarkerResult<()> {
        if name.is_empty() || name == DEFAULT_SET_NAME || name == CUSTOM_SET_NAME {
            return Err(MarkerError::ReservedSetName {
                name: name.to_string(),
            });
        }
        let exists = self.set_files.contains_key(name);
        if exists && !force_overwrite {
            return Err(MarkerError::TemplateSetExists {
                name: name.to_string(),
            });
        }

        let path = match self.set_files.get(name) {
            Some(path) => path.clone(),
            None => self
                .paths
                .saved_sets_dir
                .join(format!("{}.{}", Guid::generate(), TEMPLATE_SET_EXTENSION)),
        };
        let file = TemplateSetFile {
            version: TEMPLATE_SET_FILE_VERSION,
            name: name.to_string(),
            markers: self.current_set().markers().to_vec(),
        };
        write_set_file(&path, &file)?;

        let saved = MarkerSet::with_markers(name, file.markers);
        match self.sets.iter_mut().find(|s| s.name == name) {
            Some(existing) => *existing = saved,
            None => self.sets.push(saved),
        }
        self.set_files.insert(name.to_string(), path);
        self.publish(TemplateSetEvent::SetListChanged);
        info!(name = name, "Saved marker template set");
        Ok(())
    }

    /// Deletes a user-saved set and its file. The built-in sets cannot be
    /// deleted; deleting the current set falls back to the default set.
    pub fn delete_saved_set(&mut self, name: &str) -> MarkerResult<()> {
        let Some(path) = self.set_files.remove(name) else {
            return Err(MarkerError::UnknownTemplateSet {
                name: name.to_string(),
            });
        };
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.set_files.insert(name.to_string(), path);
                return Err(MarkerError::Io(e));
            }
        }
        self.sets.retain(|s| s.name != name);
        if self.current == name {
            self.current = DEFAULT_SET_NAME.to_string();
            self.publish(TemplateSetEvent::CurrentSetChanged);
        }
        self.publish(TemplateSetEvent::SetListChanged);
        Ok(())
    }

    // --- internals ---

    fn current_set_mut(&mut self) -> &mut MarkerSet {
        let index = self
            .sets
            .iter()
            .position(|s| s.name == self.current)
            .unwrap_or(0);
        &mut self.sets[index]
    }

    /// Editing a read-only set clones it into the scratch "Custom" set and
    /// makes that current; the source set is left untouched.
    fn fork_if_read_only(&mut self) {
        if !self.is_read_only(&self.current) {
            return;
        }
        let forked = MarkerSet::with_markers(
            CUSTOM_SET_NAME,
            self.current_set().markers().to_vec(),
        );
        debug!(from = %self.current, "Forking read-only template set into custom");
        match self.sets.iter_mut().find(|s| s.name == CUSTOM_SET_NAME) {
            Some(existing) => *existing = forked,
            None => self.sets.push(forked),
        }
        self.current = CUSTOM_SET_NAME.to_string();
        self.publish(TemplateSetEvent::SetListChanged);
        self.publish(TemplateSetEvent::CurrentSetChanged);
    }

    fn publish(&mut self, event: TemplateSetEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

/// Paths of candidate set files, sorted for deterministic load order.
fn scan_set_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMPLATE_SET_EXTENSION))
        })
        .collect();
    paths.sort();
    paths
}

fn load_set_file(path: &Path) -> MarkerResult<TemplateSetFile> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn write_set_file(path: &Path, file: &TemplateSetFile) -> MarkerResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(file)?;

    // Write to a temporary file first, then rename for atomic write.
    let temp_path = path.with_extension("markertemplateset.tmp");
    std::fs::write(&temp_path, json.as_bytes()).map_err(|e| {
        tracing::error!(path = %temp_path.display(), error = %e, "Failed to write temp file");
        MarkerError::Io(e)
    })?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        tracing::error!(
            from = %temp_path.display(),
            to = %path.display(),
            error = %e,
            "Failed to rename temp file to target"
        );
        MarkerError::Io(e)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lc_common::MarkerColor;
    use crate::marker::TagParam;

    fn temp_paths(tag: &str) -> TemplateSetPaths {
        let root = std::env::temp_dir().join(format!("lc_templates_{tag}_{}", Guid::generate()));
        TemplateSetPaths::new(root.join("sets"), root.join("settings").join(SCRATCH_SET_FILE))
    }

    fn cleanup(paths: &TemplateSetPaths) {
        if let Some(root) = paths.saved_sets_dir.parent() {
            let _ = std::fs::remove_dir_all(root);
        }
    }

    fn store(tag: &str) -> (TemplateSets, TemplateSetPaths) {
        let paths = temp_paths(tag);
        let registry = MarkerTypeRegistry::with_builtins();
        let sets = TemplateSets::initialize(paths.clone(), &registry).expect("initialize");
        (sets, paths)
    }

    #[test]
    fn default_set_is_computed_from_registry() {
        let (sets, paths) = store("default");
        assert_eq!(sets.current_name(), DEFAULT_SET_NAME);
        let default = sets.current_set();
        let registry = MarkerTypeRegistry::with_builtins();
        assert_eq!(default.len(), registry.len());
        assert_eq!(default.get(0).unwrap().marker_type, "Comment");
        cleanup(&paths);
    }

    #[test]
    fn editing_default_forks_into_custom() {
        let (mut sets, paths) = store("fork");
        let default_len = sets.current_set().len();

        sets.save_marker_to_current(Marker::new("Comment")).unwrap();

        // The custom set became current and took the edit.
        assert_eq!(sets.current_name(), CUSTOM_SET_NAME);
        assert_eq!(sets.current_set().len(), default_len + 1);
        // Default is untouched.
        assert_eq!(sets.set(DEFAULT_SET_NAME).unwrap().len(), default_len);
        cleanup(&paths);
    }

    #[test]
    fn delete_and_move_fork_too() {
        let (mut sets, paths) = store("fork_ops");
        sets.delete_marker_from_current(0).unwrap();
        assert_eq!(sets.current_name(), CUSTOM_SET_NAME);

        let (mut sets2, paths2) = store("fork_move");
        sets2.move_marker_in_current(0, 1).unwrap();
        assert_eq!(sets2.current_name(), CUSTOM_SET_NAME);
        cleanup(&paths);
        cleanup(&paths2);
    }

    #[test]
    fn out_of_range_template_ops_fail() {
        let (mut sets, paths) = store("range");
        let len = sets.current_set().len();
        assert!(matches!(
            sets.delete_marker_from_current(len + 5),
            Err(MarkerError::TemplateIndexOutOfRange { .. })
        ));
        assert!(matches!(
            sets.new_marker_from_current(len + 5),
            Err(MarkerError::TemplateIndexOutOfRange { .. })
        ));
        cleanup(&paths);
    }

    #[test]
    fn stamping_gives_fresh_ids() {
        let (mut sets, paths) = store("stamp");
        let mut template = Marker::new("Comment");
        template.name = "Interview".into();
        template.add_tag(TagParam::new("guest", "", MarkerColor::BLUE));
        sets.save_marker_to_current(template.clone()).unwrap();

        let index = sets.current_set().len() - 1;
        let stamped = sets.new_marker_from_current(index).unwrap();
        assert_ne!(stamped.id(), template.id());
        assert_eq!(stamped.name, "Interview");
        let (_, stamped_tag) = stamped.tags().next().unwrap();
        let (_, template_tag) = template.tags().next().unwrap();
        assert_ne!(stamped_tag.instance_id(), template_tag.instance_id());
        cleanup(&paths);
    }

    #[test]
    fn save_custom_set_writes_guid_named_file() {
        let (mut sets, paths) = store("save");
        sets.save_marker_to_current(Marker::new("Comment")).unwrap();
        sets.save_custom_set("Interview Pack", false).unwrap();

        let files = scan_set_files(&paths.saved_sets_dir);
        assert_eq!(files.len(), 1);
        let stem = files[0].file_stem().unwrap().to_str().unwrap();
        // GUID-named, not name-derived.
        assert!(!stem.contains("Interview"));
        assert!(sets.set("Interview Pack").is_some());
        cleanup(&paths);
    }

    #[test]
    fn save_custom_set_respects_force_overwrite() {
        let (mut sets, paths) = store("force");
        sets.save_marker_to_current(Marker::new("Comment")).unwrap();
        sets.save_custom_set("Pack", false).unwrap();

        assert!(matches!(
            sets.save_custom_set("Pack", false),
            Err(MarkerError::TemplateSetExists { .. })
        ));
        sets.save_custom_set("Pack", true).unwrap();
        // Overwrite reuses the original file rather than adding another.
        assert_eq!(scan_set_files(&paths.saved_sets_dir).len(), 1);
        cleanup(&paths);
    }

    #[test]
    fn reserved_names_are_rejected() {
        let (mut sets, paths) = store("reserved");
        for name in ["", DEFAULT_SET_NAME, CUSTOM_SET_NAME] {
            assert!(matches!(
                sets.save_custom_set(name, true),
                Err(MarkerError::ReservedSetName { .. })
            ));
        }
        cleanup(&paths);
    }

    #[test]
    fn saved_sets_are_discovered_on_initialize() {
        let (mut sets, paths) = store("discover");
        sets.save_marker_to_current(Marker::new("Chapter")).unwrap();
        sets.save_custom_set("Discovered", false).unwrap();

        let registry = MarkerTypeRegistry::with_builtins();
        let reloaded = TemplateSets::initialize(paths.clone(), &registry).unwrap();
        let found = reloaded.set("Discovered").expect("discovered set");
        assert_eq!(found.len(), sets.set("Discovered").unwrap().len());
        cleanup(&paths);
    }

    #[test]
    fn shutdown_persists_scratch_set_and_reload_restores_it() {
        let (mut sets, paths) = store("scratch");
        sets.save_marker_to_current(Marker::new("Comment")).unwrap();
        let expected_len = sets.current_set().len();
        sets.shutdown().unwrap();
        assert!(paths.scratch_file.exists());

        let registry = MarkerTypeRegistry::with_builtins();
        let reloaded = TemplateSets::initialize(paths.clone(), &registry).unwrap();
        assert_eq!(reloaded.current_name(), CUSTOM_SET_NAME);
        assert_eq!(reloaded.current_set().len(), expected_len);
        cleanup(&paths);
    }

    #[test]
    fn shutdown_removes_scratch_file_when_custom_is_empty() {
        let (mut sets, paths) = store("scratch_empty");
        sets.save_marker_to_current(Marker::new("Comment")).unwrap();
        sets.shutdown().unwrap();
        assert!(paths.scratch_file.exists());

        let registry = MarkerTypeRegistry::with_builtins();
        let mut reloaded = TemplateSets::initialize(paths.clone(), &registry).unwrap();
        // Empty out the custom set, then shut down again.
        while reloaded.current_set().len() > 0 {
            reloaded.delete_marker_from_current(0).unwrap();
        }
        reloaded.shutdown().unwrap();
        assert!(!paths.scratch_file.exists());
        cleanup(&paths);
    }

    #[test]
    fn subscribers_receive_events_until_shutdown() {
        let (mut sets, paths) = store("events");
        let rx = sets.subscribe();
        sets.save_marker_to_current(Marker::new("Comment")).unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(events.contains(&TemplateSetEvent::SetListChanged));
        assert!(events.contains(&TemplateSetEvent::CurrentSetChanged));
        assert!(events.contains(&TemplateSetEvent::SetContentChanged));

        sets.shutdown().unwrap();
        assert!(rx.try_recv().is_err());
        cleanup(&paths);
    }

    #[test]
    fn delete_saved_set_removes_file_and_falls_back() {
        let (mut sets, paths) = store("delete_set");
        sets.save_marker_to_current(Marker::new("Comment")).unwrap();
        sets.save_custom_set("Doomed", false).unwrap();
        sets.make_current("Doomed").unwrap();

        sets.delete_saved_set("Doomed").unwrap();
        assert!(sets.set("Doomed").is_none());
        assert!(scan_set_files(&paths.saved_sets_dir).is_empty());
        assert_eq!(sets.current_name(), DEFAULT_SET_NAME);

        assert!(matches!(
            sets.delete_saved_set("Doomed"),
            Err(MarkerError::UnknownTemplateSet { .. })
        ));
        cleanup(&paths);
    }
}
