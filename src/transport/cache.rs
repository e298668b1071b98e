//! On-disk response cache for camera items.
//!
//! Files on the camera never change once written, so an entry keyed by the
//! request URL stays valid for as long as it exists. Bodies are stored as
//! `<sha256(url)>.body` and probe results as `<sha256(url)>.head.json`.
//! Writes go through a temporary file and a rename, so readers never observe
//! a half-written entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::TransportError;

/// Metadata remembered from a HEAD probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedHead {
    /// The URL the probe was issued against.
    pub url: String,
    /// `Content-Type` header value, if the camera sent one.
    pub content_type: Option<String>,
}

/// Directory-backed cache of item bodies and HEAD metadata.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Creates a cache rooted at `dir`. The directory is created on first store.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cached body for `url`, or `None` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cache`] if the entry exists but cannot be read.
    pub async fn load_body(&self, url: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let path = self.entry_path(url, "body");
        match tokio::fs::read(&path).await {
            Ok(body) => {
                debug!(url, path = %path.display(), bytes = body.len(), "cache hit");
                Ok(Some(body))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TransportError::cache(path, e)),
        }
    }

    /// Stores `body` as the cached response for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cache`] if the entry cannot be written.
    pub async fn store_body(&self, url: &str, body: &[u8]) -> Result<(), TransportError> {
        let path = self.entry_path(url, "body");
        self.write_entry(&path, body).await
    }

    /// Returns the cached probe metadata for `url`, or `None` on a miss.
    ///
    /// An unreadable JSON document is treated as a miss so the next probe
    /// overwrites it.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cache`] if the entry exists but cannot be read.
    pub async fn load_head(&self, url: &str) -> Result<Option<CachedHead>, TransportError> {
        let path = self.entry_path(url, "head.json");
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TransportError::cache(path, e)),
        };
        match serde_json::from_slice::<CachedHead>(&raw) {
            Ok(head) if head.url == url => Ok(Some(head)),
            Ok(head) => {
                warn!(url, cached_url = %head.url, "cache key collision, ignoring entry");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "discarding corrupt cache entry");
                Ok(None)
            }
        }
    }

    /// Stores probe metadata for `head.url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cache`] if the entry cannot be written.
    pub async fn store_head(&self, head: &CachedHead) -> Result<(), TransportError> {
        let path = self.entry_path(&head.url, "head.json");
        let raw = serde_json::to_vec(head)
            .map_err(|e| TransportError::cache(path.clone(), std::io::Error::other(e)))?;
        self.write_entry(&path, &raw).await
    }

    async fn write_entry(&self, path: &Path, data: &[u8]) -> Result<(), TransportError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TransportError::cache(self.dir.clone(), e))?;

        let tmp_path = path.with_extension("tmp");
        let result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            tokio::fs::rename(&tmp_path, path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(TransportError::cache(path.to_path_buf(), e));
        }
        Ok(())
    }

    fn entry_path(&self, url: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}.{suffix}", cache_key(url)))
    }
}

/// Hex SHA-256 of the URL; stable across runs and safe as a file name.
fn cache_key(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}
