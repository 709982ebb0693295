//! Error types for rough-cut documents and the save pipeline.

use std::io;

use lc_library::{AssetKind, LibraryError};
use lc_xmp::XmpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoughCutError {
    /// The document is not a rough cut at all.
    #[error("not a rough-cut document")]
    NotARoughCut,

    /// An asset of this kind cannot take part in the requested operation.
    #[error("{0} assets cannot be used here")]
    UnsupportedClipKind(AssetKind),

    /// A document written by a newer tool version.
    #[error("unsupported rough-cut document version {0}")]
    UnsupportedVersion(u32),

    /// The document parsed as XML but its shape is wrong.
    #[error("malformed rough-cut document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Xmp(#[from] XmpError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type RoughCutResult<T> = Result<T, RoughCutError>;

/// A save attempt failed in a way the user can act on. Carried inside
/// [`crate::save::SaveOutcome::Failed`] and shown through the
/// [`crate::host::SavePrompt`] seam.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("media for {path} is offline")]
    Offline { path: String },

    #[error("{path} is read-only")]
    ReadOnly { path: String },

    #[error("{path} changed on disk since it was loaded")]
    StaleMetadata { path: String },

    #[error("saving {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = RoughCutError::UnsupportedVersion(9);
        assert_eq!(e.to_string(), "unsupported rough-cut document version 9");

        let e = RoughCutError::UnsupportedClipKind(AssetKind::RoughCut);
        assert_eq!(e.to_string(), "RoughCut assets cannot be used here");

        let e = SaveError::StaleMetadata {
            path: "d:/cuts/a.rcut".into(),
        };
        assert!(e.to_string().contains("changed on disk"));
    }
}
