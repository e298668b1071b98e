//! Olyshare Core Library
//!
//! Imports recent photos from a Wi-Fi camera that publishes its files through
//! an HTTP listing endpoint (`get_imglist.cgi`).
//!
//! # Architecture
//!
//! - [`camera`] - Listing retrieval and parsing
//! - [`transport`] - HTTP client and on-disk response cache
//! - [`decode`] - Capture-time extraction from image bytes
//! - [`import`] - The filter/worker pipeline and its run coordinator

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod camera;
pub mod decode;
pub mod import;
pub mod transport;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use camera::{Camera, ListingEntry, ListingError};
pub use decode::{CaptureTimeDecoder, DecodeError, ExifDecoder};
pub use import::{
    DEFAULT_RETENTION_DAYS, DEFAULT_WORKERS, ImportError, ImportJob, ImportStats, ImportSummary,
    Importer, MAX_WORKERS, MIN_WORKERS, RunOutcome, UndatedPolicy,
};
pub use transport::{CameraClient, ResponseCache, TransportError};
