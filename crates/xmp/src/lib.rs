//! `lc-xmp` -- XMP packet codec for marker metadata.
//!
//! - [`codec`]: marker collections to packet text and back, plus the merge
//!   used when saving over a file changed on disk
//! - [`rdf`]: the xmpDM RDF shape
//! - [`packet`]: the in-memory packet representation
//! - [`toolkit`]: the pluggable toolkit seam
//! - [`xml`]: minimal XML reading and writing
//!
//! Marker times inside a packet are whole frame counts at each track's own
//! frame rate; everything outside this crate works in ticks.

pub mod codec;
pub mod error;
pub mod packet;
pub mod rdf;
pub mod toolkit;
pub mod xml;

pub use codec::{
    build_markers_from_xmp, build_markers_from_xmp_with, build_xmp_from_markers,
    build_xmp_from_markers_with, merge_temporal_markers, merge_temporal_markers_with,
    MarkerDecode,
};
pub use error::{XmpError, XmpResult};
pub use packet::{XmpCuePoint, XmpMarkerRecord, XmpPacket, XmpTag, XmpTrack};
pub use toolkit::{BundledToolkit, SerializeOptions, XmpToolkit};
