//! Unified error types for the Hotswap workspace.
//!
//! Every per-application error here is isolated by design: a failing record
//! must never take down the controller or block another record's redeploy,
//! so callers catch these, log them, and move on.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum HotswapError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A coordinate could not be resolved against its repository.
    ///
    /// Per-record and non-fatal: the record keeps its previous descriptor.
    #[error("cannot resolve {coordinate}: {message}")]
    Resolution {
        /// Coordinate that failed to resolve.
        coordinate: String,
        /// Description of the resolution failure.
        message: String,
    },

    /// A container-host start/stop/remove call failed.
    ///
    /// Per-record and non-fatal: the record transitions to `Failed`.
    #[error("lifecycle error for {context_path}: {message}")]
    Lifecycle {
        /// Context path of the affected application.
        context_path: String,
        /// Description of the lifecycle failure.
        message: String,
    },

    /// A resource set could not be built from its archive.
    ///
    /// Aborts only the in-flight deploy attempt that needed the archive.
    #[error("cannot open resource archive {archive}: {message}")]
    Construction {
        /// Archive that could not be opened.
        archive: PathBuf,
        /// Description of the construction failure.
        message: String,
    },

    /// A hash validation failed.
    #[error("hash mismatch for {resource}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected hash value.
        expected: String,
        /// Actual computed hash value.
        actual: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HotswapError>;

impl HotswapError {
    /// Builds an `Io` error for the given path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a `Resolution` error for the given coordinate.
    #[must_use]
    pub fn resolution(coordinate: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            coordinate: coordinate.into(),
            message: message.into(),
        }
    }

    /// Builds a `Lifecycle` error for the given context path.
    #[must_use]
    pub fn lifecycle(context_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            context_path: context_path.into(),
            message: message.into(),
        }
    }
}
