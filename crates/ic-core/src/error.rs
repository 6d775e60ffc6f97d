//! Unified error type for image-classes.
//!
//! Every crate funnels its failures into [`Error`]. Cleanup failures are the
//! one exception: they are reported to a cleanup hook and never surface here.

use std::fmt;
use std::path::Path;

/// Unified error type covering all failure modes in image-classes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "record").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A record, schema or configuration value failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Decoding, transforming or encoding an image failed.
    #[error("Image error [{path}]: {message}")]
    Image {
        /// Path of the image being processed.
        path: String,
        /// Human-readable error description.
        message: String,
    },

    /// A lifecycle stage failed.
    #[error("Pipeline error [{step}]: {message}")]
    Pipeline {
        /// The stage that failed.
        step: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Image`].
    pub fn image(path: &Path, message: impl fmt::Display) -> Self {
        Error::Image {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Pipeline`].
    pub fn pipeline(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pipeline {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the looked-up entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
