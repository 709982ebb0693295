//! Error type for XMP encode and decode.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmpError {
    /// The packet text is not well-formed XML/RDF.
    #[error("Malformed XMP packet: {0}")]
    Malformed(String),

    /// A frame rate was zero or unparseable where frame counts had to be
    /// converted to time. Carries the offending rate string.
    #[error("Invalid frame rate in XMP track: {0:?}")]
    InvalidFrameRate(String),
}

pub type XmpResult<T> = Result<T, XmpError>;
