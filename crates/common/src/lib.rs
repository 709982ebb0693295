//! `lc-common` -- Shared types for the LogCut metadata engine.
//!
//! This crate is the foundation the other engine crates depend on:
//!
//! - **Time**: `TickTime` (fixed-point ticks), `Rational` rates, timecode formatting
//! - **Identity**: `Guid` (opaque stable identifiers, v4 UUIDs when generated locally)
//! - **Color**: `MarkerColor` (packed ARGB used across metadata interchange)

pub mod color;
pub mod types;

// Re-export commonly used items at crate root
pub use color::MarkerColor;
pub use types::{format_timecode, Guid, Rational, TickTime, TICKS_PER_SECOND};
