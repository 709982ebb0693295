//! Error types for the marker crate (thiserror-based).

use thiserror::Error;

/// Errors that can occur during marker model and template set operations.
#[derive(Error, Debug)]
pub enum MarkerError {
    /// A composite marker was built over zero markers, or every selected
    /// id has since left the owning collection.
    #[error("Marker selection is empty")]
    EmptySelection,

    /// A start time or duration went below zero.
    #[error("Negative time value: {ticks} ticks")]
    NegativeTime { ticks: i64 },

    /// A template set name was requested that is not loaded.
    #[error("Unknown template set: {name}")]
    UnknownTemplateSet { name: String },

    /// Saving a named set would overwrite an existing one without consent.
    #[error("Template set already exists: {name}")]
    TemplateSetExists { name: String },

    /// The built-in set names cannot be used for user-saved sets.
    #[error("Template set name is reserved: {name}")]
    ReservedSetName { name: String },

    /// A template index is outside the current set.
    #[error("Template index {index} out of range (set has {len})")]
    TemplateIndexOutOfRange { index: usize, len: usize },

    /// File I/O error while persisting or scanning template sets.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template set file is not valid JSON for the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type for marker operations.
pub type MarkerResult<T> = Result<T, MarkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = MarkerError::NegativeTime { ticks: -12 };
        assert!(err.to_string().contains("-12"));

        let err = MarkerError::UnknownTemplateSet {
            name: "Interview".into(),
        };
        assert!(err.to_string().contains("Interview"));

        let err = MarkerError::TemplateIndexOutOfRange { index: 4, len: 2 };
        let msg = err.to_string();
        assert!(msg.contains('4') && msg.contains('2'));
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MarkerError = io_err.into();
        assert!(matches!(err, MarkerError::Io(_)));
    }
}
