//! `lc-marker` -- the marker data model.
//!
//! - [`marker`]: the marker record, its tag parameters, and owner back-refs
//! - [`tracks`]: time-ordered marker collections with per-type views
//! - [`composite`]: one editable record projected over a selection
//! - [`registry`]: known marker types, built-in and auto-registered
//! - [`template`]: named, persisted template sets with fork-on-write
//! - [`error`]: the crate error type

pub mod composite;
pub mod error;
pub mod marker;
pub mod registry;
pub mod template;
pub mod tracks;

pub use composite::{CompositeMarker, MULTIPLE_VALUES};
pub use error::{MarkerError, MarkerResult};
pub use marker::{CuePoint, Marker, MarkerOwner, TagParam};
pub use registry::{MarkerTypeDef, MarkerTypeRegistry};
pub use template::{TemplateSetEvent, TemplateSetPaths, TemplateSets};
pub use tracks::{MarkerSet, MarkerTrack, MarkerTracks};
