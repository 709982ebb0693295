//! Error types for marker exports.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Some of an asset's thumbnails could not be produced or written.
    /// Individual causes are logged where they happen.
    #[error("{failed} thumbnail(s) could not be exported")]
    Thumbnails { failed: usize },
}

pub type ExportResult<T> = Result<T, ExportError>;
