//! Skip predicates evaluated before an item is handed to a worker.
//!
//! A [`FilterChain`] runs its filters in order and stops at the first one
//! that asks to skip. Cheap local checks go first so the HEAD probe only
//! runs for items that would otherwise be downloaded.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::RemoteItem;
use crate::transport::CameraClient;

/// One skip predicate.
#[async_trait]
pub trait SkipFilter: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if `item` must not be imported.
    ///
    /// Filters may fill in fields of `item` (the content-type probe does).
    async fn should_skip(&self, item: &mut RemoteItem) -> bool;
}

/// Ordered, short-circuiting list of filters.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn SkipFilter>>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

impl FilterChain {
    /// Creates an empty chain that skips nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter.
    #[must_use]
    pub fn with(mut self, filter: impl SkipFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Returns the number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Returns the name of the first filter that skips `item`, if any.
    pub async fn first_skip(&self, item: &mut RemoteItem) -> Option<&'static str> {
        for filter in &self.filters {
            if filter.should_skip(item).await {
                debug!(item = %item.id, filter = filter.name(), "skipping item");
                return Some(filter.name());
            }
        }
        None
    }
}

/// Skips items whose file already exists in the destination.
#[derive(Debug, Clone)]
pub struct AlreadyPresent {
    destination: PathBuf,
}

impl AlreadyPresent {
    /// Checks for existing files under `destination`.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl SkipFilter for AlreadyPresent {
    fn name(&self) -> &'static str {
        "already-present"
    }

    async fn should_skip(&self, item: &mut RemoteItem) -> bool {
        let path = self.destination.join(item.id.base_filename());
        tokio::fs::try_exists(&path).await.unwrap_or(false)
    }
}

/// Skips a base filename that was already admitted earlier in the run.
///
/// The camera listing can repeat an identifier; without this filter two
/// workers could race on the same destination file.
#[derive(Debug, Default)]
pub struct ClaimedThisRun {
    claimed: Mutex<HashSet<String>>,
}

impl ClaimedThisRun {
    /// Creates an empty claim set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SkipFilter for ClaimedThisRun {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    async fn should_skip(&self, item: &mut RemoteItem) -> bool {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        !claimed.insert(item.id.base_filename().to_string())
    }
}

/// Skips items whose probed content type is excluded.
///
/// Fails closed: a failed probe skips the item instead of downloading it.
/// A response without `Content-Type` is not excluded.
#[derive(Debug, Clone)]
pub struct ContentTypeExclusion {
    client: CameraClient,
    excluded: Arc<HashSet<String>>,
}

impl ContentTypeExclusion {
    /// Probes through `client` and skips types in `excluded`.
    ///
    /// Entries of `excluded` must already be normalized with
    /// [`normalize_content_type`].
    #[must_use]
    pub fn new(client: CameraClient, excluded: Arc<HashSet<String>>) -> Self {
        Self { client, excluded }
    }
}

#[async_trait]
impl SkipFilter for ContentTypeExclusion {
    fn name(&self) -> &'static str {
        "content-type"
    }

    async fn should_skip(&self, item: &mut RemoteItem) -> bool {
        match self.client.probe_content_type(item.id.as_str()).await {
            Ok(content_type) => {
                let normalized = content_type.as_deref().map(normalize_content_type);
                let excluded = normalized
                    .as_ref()
                    .is_some_and(|ct| self.excluded.contains(ct));
                item.content_type = normalized;
                excluded
            }
            Err(e) => {
                warn!(item = %item.id, error = %e, "content type probe failed, skipping item");
                true
            }
        }
    }
}

/// Lowercases a media type and strips parameters (`; charset=...`).
#[must_use]
pub fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
