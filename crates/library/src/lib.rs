//! `lc-library` -- asset, transition, and media-info model.
//!
//! - [`asset`] -- master clips, sub-clips, rough cuts, and their ranges
//! - [`transition`] -- per-track transition placements on rough cuts
//! - [`media_info`] -- last-persisted metadata snapshots per media file
//! - [`registry`] -- shared ownership of those snapshots, keyed by path

pub mod asset;
pub mod error;
pub mod media_info;
pub mod registry;
pub mod transition;

pub use asset::{AssetItem, AssetKind};
pub use error::{LibraryError, LibraryResult};
pub use media_info::AssetMediaInfo;
pub use registry::MediaInfoRegistry;
pub use transition::{MediaKind, TrackTransitionMap, TransitionAlignment, TransitionItem};
