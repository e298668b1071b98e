//! Camera description and listing retrieval.
//!
//! A [`Camera`] knows where its listing lives; [`Camera::list_items`] fetches
//! that listing through a [`CameraClient`] and parses it into
//! [`ListingEntry`] values ordered newest first.

mod listing;

use std::fmt;

use thiserror::Error;
use tracing::{info, instrument};

use crate::transport::constants::{DEFAULT_CAMERA_URL, DEFAULT_IMAGE_DIR, LISTING_ENDPOINT};
use crate::transport::{CameraClient, TransportError};

pub use listing::parse_listing;

/// Identifier of one file on the camera, e.g. `/DCIM/100OLYMP/P3300029.JPG`.
///
/// Identifiers are opaque; the listing may contain the same one twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingEntry(String);

impl ListingEntry {
    /// Wraps a raw identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as published by the camera.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment, used as the destination file name.
    #[must_use]
    pub fn base_filename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised while retrieving the listing.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The listing request failed.
    #[error("could not fetch image listing: {0}")]
    Transport(#[from] TransportError),

    /// The listing body could not be read.
    #[error("could not read image listing from {url}: {source}")]
    Read {
        /// The listing URL.
        url: String,
        /// The underlying read error.
        #[source]
        source: std::io::Error,
    },
}

/// A camera reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    base_url: String,
    image_dir: String,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_CAMERA_URL, DEFAULT_IMAGE_DIR)
    }
}

impl Camera {
    /// Describes a camera at `base_url` whose images live in `image_dir`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, image_dir: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let image_dir = image_dir.into();
        let image_dir = if image_dir.starts_with('/') {
            image_dir
        } else {
            format!("/{image_dir}")
        };
        Self {
            base_url,
            image_dir,
        }
    }

    /// Returns the camera base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the image directory on the camera.
    #[must_use]
    pub fn image_dir(&self) -> &str {
        &self.image_dir
    }

    /// Returns the listing URL, e.g.
    /// `http://192.168.0.10/get_imglist.cgi?DIR=/DCIM/100OLYMP`.
    #[must_use]
    pub fn listing_url(&self) -> String {
        format!("{}{LISTING_ENDPOINT}?DIR={}", self.base_url, self.image_dir)
    }

    /// Fetches and parses the listing, newest entries first.
    ///
    /// # Errors
    ///
    /// Returns [`ListingError`] if the request fails or the body cannot be read.
    #[instrument(skip(self, client), fields(camera = %self.base_url))]
    pub async fn list_items(&self, client: &CameraClient) -> Result<Vec<ListingEntry>, ListingError> {
        let url = self.listing_url();
        let body = client.fetch_listing(&url).await?;
        let entries =
            parse_listing(body.as_slice()).map_err(|source| ListingError::Read { url, source })?;
        info!(entries = entries.len(), "listed camera images");
        Ok(entries)
    }
}
