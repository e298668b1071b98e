//! HTTP client wrapper for talking to the camera.
//!
//! [`CameraClient`] issues the three requests the importer needs: the listing
//! GET, the per-item HEAD probe and the per-item body GET. Item requests are
//! served from the [`ResponseCache`] when one is configured; the listing is
//! always fetched fresh.
//!
//! None of the methods know about cancellation. Callers race the returned
//! futures against their cancellation token; dropping a future aborts the
//! in-flight request.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use tracing::{debug, instrument, warn};
use url::Url;

use super::TransportError;
use super::cache::{CachedHead, ResponseCache};
use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use crate::user_agent;

/// Upper bound on the body buffer reserved up front from `Content-Length`.
const MAX_PREALLOCATED_BODY: usize = 64 * 1024 * 1024;

/// HTTP client bound to one camera.
///
/// Cheap to clone; clones share the connection pool and the cache directory.
#[derive(Debug, Clone)]
pub struct CameraClient {
    client: Client,
    base_url: String,
    cache: Option<ResponseCache>,
}

impl CameraClient {
    /// Creates a client for the camera at `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] if `base_url` is not an absolute
    /// http(s) URL, or [`TransportError::Network`] if the client cannot be built.
    pub fn new(base_url: &str, cache: Option<ResponseCache>) -> Result<Self, TransportError> {
        Self::with_timeouts(base_url, cache, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Same as [`CameraClient::new`].
    #[instrument(level = "debug", skip(cache))]
    pub fn with_timeouts(
        base_url: &str,
        cache: Option<ResponseCache>,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, TransportError> {
        let parsed = Url::parse(base_url).map_err(|_| TransportError::invalid_url(base_url))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(TransportError::invalid_url(base_url));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|e| TransportError::network(base_url, e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// Returns the camera base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the absolute URL for a listing identifier such as
    /// `/DCIM/100OLYMP/P3300029.JPG`.
    #[must_use]
    pub fn item_url(&self, id: &str) -> String {
        if id.starts_with('/') {
            format!("{}{id}", self.base_url)
        } else {
            format!("{}/{id}", self.base_url)
        }
    }

    /// Fetches the raw listing document. Never cached.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails or the camera
    /// answers with a non-success status.
    #[instrument(skip(self))]
    pub async fn fetch_listing(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.send(Method::GET, url).await?;
        read_body(response, url).await
    }

    /// Issues a HEAD request for the item and returns its `Content-Type`.
    ///
    /// Returns `Ok(None)` when the camera answers without the header.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails or the camera
    /// answers with a non-success status.
    #[instrument(skip(self), fields(item = %id))]
    pub async fn probe_content_type(&self, id: &str) -> Result<Option<String>, TransportError> {
        let url = self.item_url(id);

        if let Some(cache) = &self.cache {
            match cache.load_head(&url).await {
                Ok(Some(head)) => return Ok(head.content_type),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "cache read failed, probing camera"),
            }
        }

        let response = self.send(Method::HEAD, &url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);
        debug!(url = %url, content_type = ?content_type, "probed item");

        if let Some(cache) = &self.cache {
            let head = CachedHead {
                url,
                content_type: content_type.clone(),
            };
            if let Err(e) = cache.store_head(&head).await {
                warn!(error = %e, "failed to cache probe result");
            }
        }

        Ok(content_type)
    }

    /// Fetches the full item body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails, the camera answers
    /// with a non-success status, or the body stream breaks.
    #[instrument(skip(self), fields(item = %id))]
    pub async fn fetch_item(&self, id: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.item_url(id);

        if let Some(cache) = &self.cache {
            match cache.load_body(&url).await {
                Ok(Some(body)) => return Ok(body),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "cache read failed, fetching from camera"),
            }
        }

        let response = self.send(Method::GET, &url).await?;
        let body = read_body(response, &url).await?;
        debug!(url = %url, bytes = body.len(), "fetched item");

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.store_body(&url, &body).await {
                warn!(error = %e, "failed to cache item body");
            }
        }

        Ok(body)
    }

    async fn send(&self, method: Method, url: &str) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| TransportError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

/// Streams the response body into memory.
async fn read_body(response: reqwest::Response, url: &str) -> Result<Vec<u8>, TransportError> {
    let capacity = response
        .content_length()
        .and_then(|len| usize::try_from(len).ok())
        .unwrap_or(0)
        .min(MAX_PREALLOCATED_BODY);
    let mut body = Vec::with_capacity(capacity);
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransportError::network(url, e))?;
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
