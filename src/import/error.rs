//! Error type for an import run.

use std::path::PathBuf;

use thiserror::Error;

use crate::camera::ListingError;
use crate::decode::DecodeError;
use crate::transport::TransportError;

/// The single fatal condition that ends an import run.
///
/// Reaching the age cutoff is not an error and has no variant here.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The listing could not be retrieved or read.
    #[error(transparent)]
    Listing(#[from] ListingError),

    /// An item body could not be fetched.
    #[error("failed to fetch {item}: {source}")]
    Fetch {
        /// The listing identifier.
        item: String,
        /// The transport failure.
        #[source]
        source: TransportError,
    },

    /// No capture time could be read from an item.
    #[error("failed to read capture time of {item}: {source}")]
    Decode {
        /// The listing identifier.
        item: String,
        /// The decode failure.
        #[source]
        source: DecodeError,
    },

    /// Writing an item to the destination failed.
    #[error("failed to write {path}: {source}")]
    Persist {
        /// The destination file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination cannot be used.
    #[error("invalid destination {path}: {reason}")]
    InvalidDestination {
        /// The configured destination directory.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// A worker task ended abnormally.
    #[error("import worker failed: {0}")]
    Worker(String),

    /// The run was cancelled from outside (Ctrl-C, SIGHUP).
    #[error("import interrupted")]
    Interrupted,
}

impl ImportError {
    /// Creates a fetch error for `item`.
    pub fn fetch(item: impl Into<String>, source: TransportError) -> Self {
        Self::Fetch {
            item: item.into(),
            source,
        }
    }

    /// Creates a decode error for `item`.
    pub fn decode(item: impl Into<String>, source: DecodeError) -> Self {
        Self::Decode {
            item: item.into(),
            source,
        }
    }

    /// Creates a persistence error for `path`.
    pub fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persist {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-destination error.
    pub fn invalid_destination(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidDestination {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
