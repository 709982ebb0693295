//! Marker type registry -- by-name lookup with auto-registration.
//!
//! An explicit context object, created once per engine instance and passed
//! to the codec and template store. Metadata written by newer tool versions
//! may carry custom type names; those are auto-registered on decode rather
//! than rejected.

use lc_common::MarkerColor;
use tracing::{debug, info};

/// Built-in marker type names.
pub const TYPE_COMMENT: &str = "Comment";
pub const TYPE_CHAPTER: &str = "Chapter";
pub const TYPE_SUBCLIP: &str = "Subclip";
pub const TYPE_WEB_LINK: &str = "WebLink";
pub const TYPE_CUE_POINT: &str = "CuePoint";
pub const TYPE_SPEECH: &str = "Speech";

/// One registered marker type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerTypeDef {
    /// Stable type name used in serialized metadata.
    pub name: String,
    /// Display label for menus and template sets.
    pub label: String,
    /// Default color for new markers of this type.
    pub color: MarkerColor,
    /// False for types discovered in foreign metadata.
    pub builtin: bool,
}

/// Registry holding the known marker types in registration order.
#[derive(Clone, Debug, Default)]
pub struct MarkerTypeRegistry {
    types: Vec<MarkerTypeDef>,
}

impl MarkerTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in marker types registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtin(TYPE_COMMENT, "Comment", MarkerColor::GREEN);
        registry.register_builtin(TYPE_CHAPTER, "Chapter", MarkerColor::RED);
        registry.register_builtin(TYPE_SUBCLIP, "Subclip", MarkerColor::BLUE);
        registry.register_builtin(TYPE_WEB_LINK, "Web Link", MarkerColor::ORANGE);
        registry.register_builtin(TYPE_CUE_POINT, "Cue Point", MarkerColor::YELLOW);
        registry.register_builtin(TYPE_SPEECH, "Speech Transcription", MarkerColor::PURPLE);

        info!(count = registry.len(), "Registered built-in marker types");
        registry
    }

    fn register_builtin(&mut self, name: &str, label: &str, color: MarkerColor) {
        self.types.push(MarkerTypeDef {
            name: name.to_string(),
            label: label.to_string(),
            color,
            builtin: true,
        });
    }

    /// Registers a type. Returns false (and leaves the existing definition
    /// alone) when the name is already registered.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        color: MarkerColor,
    ) -> bool {
        let name = name.into();
        if self.is_registered(&name) {
            return false;
        }
        self.types.push(MarkerTypeDef {
            name,
            label: label.into(),
            color,
            builtin: false,
        });
        true
    }

    /// Auto-registration entry point used by the decoder: unknown names get
    /// a definition named after themselves. Returns true when the name was
    /// newly added.
    pub fn ensure_registered(&mut self, name: &str) -> bool {
        if name.is_empty() || self.is_registered(name) {
            return false;
        }
        debug!(marker_type = name, "auto-registering foreign marker type");
        self.types.push(MarkerTypeDef {
            name: name.to_string(),
            label: name.to_string(),
            color: MarkerColor::GRAY,
            builtin: false,
        });
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.types.iter().any(|t| t.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&MarkerTypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkerTypeDef> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_present_in_order() {
        let registry = MarkerTypeRegistry::with_builtins();
        assert!(registry.is_registered(TYPE_COMMENT));
        assert!(registry.is_registered(TYPE_SPEECH));
        let first = registry.iter().next().unwrap();
        assert_eq!(first.name, TYPE_COMMENT);
    }

    #[test]
    fn register_refuses_duplicates() {
        let mut registry = MarkerTypeRegistry::with_builtins();
        let before = registry.len();
        assert!(!registry.register(TYPE_COMMENT, "Other", MarkerColor::GRAY));
        assert_eq!(registry.len(), before);
        assert_eq!(registry.get(TYPE_COMMENT).unwrap().label, "Comment");
    }

    #[test]
    fn ensure_registered_adds_unknown_types_once() {
        let mut registry = MarkerTypeRegistry::with_builtins();
        assert!(registry.ensure_registered("VendorCustom"));
        assert!(!registry.ensure_registered("VendorCustom"));
        let def = registry.get("VendorCustom").unwrap();
        assert_eq!(def.label, "VendorCustom");
        assert!(!def.builtin);
    }

    #[test]
    fn ensure_registered_ignores_empty_names() {
        let mut registry = MarkerTypeRegistry::new();
        assert!(!registry.ensure_registered(""));
        assert!(registry.is_empty());
    }
}
