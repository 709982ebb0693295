//! Pluggable XMP toolkit seam.
//!
//! Encode and decode go through [`XmpToolkit`] so the bundled reader/writer
//! can be swapped for an external metadata SDK without touching callers.

use crate::error::XmpResult;
use crate::packet::XmpPacket;
use crate::rdf;

/// Serialization knobs honored by every toolkit.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerializeOptions {
    /// Emit bare `x:xmpmeta` without the surrounding xpacket instructions,
    /// for embedding into a host document.
    pub omit_packet_wrapper: bool,
}

pub trait XmpToolkit: Send + Sync {
    /// Parses the marker-bearing slice of a packet out of `buffer`.
    fn parse_from_buffer(&self, buffer: &str) -> XmpResult<XmpPacket>;

    /// Renders `packet` as XMP text.
    fn serialize_to_buffer(&self, packet: &XmpPacket, options: &SerializeOptions)
        -> XmpResult<String>;
}

/// The built-in reader/writer.
#[derive(Clone, Copy, Debug, Default)]
pub struct BundledToolkit;

impl XmpToolkit for BundledToolkit {
    fn parse_from_buffer(&self, buffer: &str) -> XmpResult<XmpPacket> {
        rdf::parse_packet(buffer)
    }

    fn serialize_to_buffer(
        &self,
        packet: &XmpPacket,
        options: &SerializeOptions,
    ) -> XmpResult<String> {
        Ok(rdf::write_packet(packet, options))
    }
}
