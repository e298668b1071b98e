//! Import pipeline: listing → filters → workers → destination.
//!
//! [`Importer::run`] drives one run. The calling task lists the camera and
//! acts as the producer: each entry goes through the [`FilterChain`] and, if
//! admitted, into a bounded queue read by a fixed pool of workers. Workers
//! fetch the body, decode its capture time, check it against the retention
//! window and persist it. The [`RunCoordinator`] turns the first error, the
//! retention cutoff or an interrupt into exactly one result.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use olyshare_core::camera::Camera;
//! use olyshare_core::decode::ExifDecoder;
//! use olyshare_core::import::{ImportJob, Importer};
//! use olyshare_core::transport::CameraClient;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let camera = Camera::default();
//! let client = CameraClient::new(camera.base_url(), None)?;
//! let job = ImportJob::new("./output").with_workers(2);
//! let importer = Importer::new(job, client, Arc::new(ExifDecoder::new()));
//! let summary = importer.run(&camera, &CancellationToken::new()).await?;
//! println!("imported {} files", summary.persisted);
//! # Ok(())
//! # }
//! ```

mod age_gate;
mod coordinator;
mod error;
mod filter;
mod persist;
mod worker;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::camera::{Camera, ListingEntry};
use crate::decode::CaptureTimeDecoder;
use crate::transport::CameraClient;

pub use age_gate::{AgeDecision, AgeGate};
pub use coordinator::{RunCoordinator, RunPhase};
pub use error::ImportError;
pub use filter::{
    AlreadyPresent, ClaimedThisRun, ContentTypeExclusion, FilterChain, SkipFilter,
    normalize_content_type,
};
pub use persist::{destination_path, persist_item};

use worker::{WorkerContext, run_worker};

/// Default number of concurrent workers.
pub const DEFAULT_WORKERS: usize = 2;

/// Smallest accepted worker count.
pub const MIN_WORKERS: usize = 1;

/// Largest accepted worker count; the camera serves few parallel requests.
pub const MAX_WORKERS: usize = 4;

/// Default retention window in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 1;

/// Content type of movies recorded as QuickTime.
pub const CONTENT_TYPE_QUICKTIME: &str = "video/quicktime";

/// Content type of movies recorded as AVI.
pub const CONTENT_TYPE_AVI: &str = "video/x-msvideo";

/// Content type of Olympus raw files.
pub const CONTENT_TYPE_OLYMPUS_RAW: &str = "image/x-olympus-orf";

/// Content types excluded by `--skip-movie`.
pub const MOVIE_CONTENT_TYPES: &[&str] = &[CONTENT_TYPE_QUICKTIME, CONTENT_TYPE_AVI];

/// Content types excluded by `--skip-raw`.
pub const RAW_CONTENT_TYPES: &[&str] = &[CONTENT_TYPE_OLYMPUS_RAW];

/// One file travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Identifier from the listing.
    pub id: ListingEntry,
    /// Normalized content type, set by the probe filter.
    pub content_type: Option<String>,
    /// Capture time, set by the worker after decoding.
    pub captured_at: Option<DateTime<Utc>>,
}

impl RemoteItem {
    /// Creates an item with no probed or decoded fields.
    #[must_use]
    pub fn new(id: ListingEntry) -> Self {
        Self {
            id,
            content_type: None,
            captured_at: None,
        }
    }
}

/// What to do with an item whose capture time cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UndatedPolicy {
    /// Fail the run.
    #[default]
    Abort,
    /// Skip the item and continue.
    Skip,
}

/// Run-level settings, immutable once the run starts.
#[derive(Debug, Clone)]
pub struct ImportJob {
    destination: PathBuf,
    retention_days: i64,
    workers: usize,
    excluded_content_types: HashSet<String>,
    undated_policy: UndatedPolicy,
}

impl ImportJob {
    /// Creates a job writing into `destination` with default settings.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            retention_days: DEFAULT_RETENTION_DAYS,
            workers: DEFAULT_WORKERS,
            excluded_content_types: HashSet::new(),
            undated_policy: UndatedPolicy::default(),
        }
    }

    /// Sets the retention window; zero or negative disables the cutoff.
    #[must_use]
    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.retention_days = days;
        self
    }

    /// Sets the worker count, clamped to [`MIN_WORKERS`]..=[`MAX_WORKERS`].
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        let clamped = workers.clamp(MIN_WORKERS, MAX_WORKERS);
        if clamped != workers {
            warn!(requested = workers, using = clamped, "worker count out of range");
        }
        self.workers = clamped;
        self
    }

    /// Adds content types to exclude; values are normalized.
    #[must_use]
    pub fn exclude_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_content_types.extend(
            types
                .into_iter()
                .map(|t| normalize_content_type(t.as_ref()))
                .filter(|t| !t.is_empty()),
        );
        self
    }

    /// Sets the undated-item policy.
    #[must_use]
    pub fn with_undated_policy(mut self, policy: UndatedPolicy) -> Self {
        self.undated_policy = policy;
        self
    }

    /// Returns the destination directory.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Returns the retention window in days.
    #[must_use]
    pub fn retention_days(&self) -> i64 {
        self.retention_days
    }

    /// Returns the worker count.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the normalized excluded content types.
    #[must_use]
    pub fn excluded_content_types(&self) -> &HashSet<String> {
        &self.excluded_content_types
    }

    /// Returns the undated-item policy.
    #[must_use]
    pub fn undated_policy(&self) -> UndatedPolicy {
        self.undated_policy
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every admitted item was handled.
    Completed,
    /// An item older than the retention window stopped the run.
    CutoffReached,
}

/// Counters updated while a run is in progress.
///
/// Shared with the progress display, so every field is atomic.
#[derive(Debug, Default)]
pub struct ImportStats {
    listed: AtomicUsize,
    skipped: AtomicUsize,
    admitted: AtomicUsize,
    persisted: AtomicUsize,
    undated: AtomicUsize,
}

impl ImportStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of listing entries.
    #[must_use]
    pub fn listed(&self) -> usize {
        self.listed.load(Ordering::SeqCst)
    }

    /// Returns the number of entries rejected by a filter.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of items handed to workers.
    #[must_use]
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::SeqCst)
    }

    /// Returns the number of files written.
    #[must_use]
    pub fn persisted(&self) -> usize {
        self.persisted.load(Ordering::SeqCst)
    }

    /// Returns the number of items skipped for lack of a capture time.
    #[must_use]
    pub fn undated(&self) -> usize {
        self.undated.load(Ordering::SeqCst)
    }

    fn set_listed(&self, count: usize) {
        self.listed.store(count, Ordering::SeqCst);
    }

    fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_persisted(&self) {
        self.persisted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn increment_undated(&self) {
        self.undated.fetch_add(1, Ordering::SeqCst);
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Listing entries seen.
    pub listed: usize,
    /// Entries rejected by a filter.
    pub skipped: usize,
    /// Items handed to workers.
    pub admitted: usize,
    /// Files written.
    pub persisted: usize,
    /// Items skipped for lack of a capture time.
    pub undated: usize,
}

impl ImportSummary {
    fn new(outcome: RunOutcome, stats: &ImportStats) -> Self {
        Self {
            outcome,
            listed: stats.listed(),
            skipped: stats.skipped(),
            admitted: stats.admitted(),
            persisted: stats.persisted(),
            undated: stats.undated(),
        }
    }
}

/// Runs import jobs against a camera.
#[derive(Debug, Clone)]
pub struct Importer {
    job: Arc<ImportJob>,
    client: CameraClient,
    decoder: Arc<dyn CaptureTimeDecoder>,
}

impl Importer {
    /// Creates an importer.
    #[must_use]
    pub fn new(job: ImportJob, client: CameraClient, decoder: Arc<dyn CaptureTimeDecoder>) -> Self {
        Self {
            job: Arc::new(job),
            client,
            decoder,
        }
    }

    /// Returns the job this importer runs.
    #[must_use]
    pub fn job(&self) -> &ImportJob {
        &self.job
    }

    /// Runs one import.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`ImportError`], or
    /// [`ImportError::Interrupted`] if `interrupt` was cancelled.
    pub async fn run(
        &self,
        camera: &Camera,
        interrupt: &CancellationToken,
    ) -> Result<ImportSummary, ImportError> {
        self.run_with_stats(camera, interrupt, Arc::new(ImportStats::new()))
            .await
    }

    /// Runs one import, updating `stats` as it goes.
    ///
    /// # Errors
    ///
    /// Same as [`Importer::run`].
    #[instrument(skip(self, camera, interrupt, stats), fields(
        camera = %camera.base_url(),
        destination = %self.job.destination().display(),
        workers = self.job.workers(),
    ))]
    pub async fn run_with_stats(
        &self,
        camera: &Camera,
        interrupt: &CancellationToken,
        stats: Arc<ImportStats>,
    ) -> Result<ImportSummary, ImportError> {
        self.check_destination().await?;

        let coordinator = Arc::new(RunCoordinator::new(interrupt));
        let token = coordinator.token().clone();

        let entries = tokio::select! {
            biased;
            () = token.cancelled() => None,
            listing = camera.list_items(&self.client) => Some(listing?),
        };
        let Some(entries) = entries else {
            return coordinator.finish().map(|outcome| ImportSummary::new(outcome, &stats));
        };
        stats.set_listed(entries.len());

        let ctx = Arc::new(WorkerContext {
            client: self.client.clone(),
            decoder: Arc::clone(&self.decoder),
            job: Arc::clone(&self.job),
            gate: AgeGate::new(self.job.retention_days()),
            started_at: Utc::now(),
            coordinator: Arc::clone(&coordinator),
            stats: Arc::clone(&stats),
        });

        let (tx, rx) = mpsc::channel(self.job.workers());
        let queue = Arc::new(Mutex::new(rx));
        let handles: Vec<_> = (0..self.job.workers())
            .map(|worker| tokio::spawn(run_worker(worker, Arc::clone(&ctx), Arc::clone(&queue))))
            .collect();
        // Only workers hold the receiver, so `send` fails once they are all gone.
        drop(queue);

        coordinator.enter(RunPhase::Filtering);
        let filters = self.filter_chain();
        for entry in entries {
            if token.is_cancelled() {
                break;
            }
            let mut item = RemoteItem::new(entry);
            let skipped = tokio::select! {
                biased;
                () = token.cancelled() => break,
                skipped = filters.first_skip(&mut item) => skipped,
            };
            if skipped.is_some() {
                stats.increment_skipped();
                continue;
            }
            let sent = tokio::select! {
                biased;
                () = token.cancelled() => break,
                sent = tx.send(item) => sent,
            };
            if sent.is_err() {
                // Every worker is gone; the coordinator already knows why.
                break;
            }
            stats.increment_admitted();
        }
        drop(tx);

        coordinator.enter(RunPhase::Draining);
        debug!("waiting for workers");
        for handle in handles {
            if let Err(e) = handle.await {
                coordinator.fail(ImportError::Worker(e.to_string()));
            }
        }

        let outcome = coordinator.finish()?;
        let summary = ImportSummary::new(outcome, &stats);
        info!(
            outcome = ?summary.outcome,
            listed = summary.listed,
            skipped = summary.skipped,
            persisted = summary.persisted,
            undated = summary.undated,
            "import finished"
        );
        Ok(summary)
    }

    /// Builds the filters in evaluation order: cheap local checks first.
    ///
    /// The content-type probe always runs, so an item whose probe fails is
    /// skipped even when nothing is excluded.
    fn filter_chain(&self) -> FilterChain {
        FilterChain::new()
            .with(AlreadyPresent::new(self.job.destination()))
            .with(ClaimedThisRun::new())
            .with(ContentTypeExclusion::new(
                self.client.clone(),
                Arc::new(self.job.excluded_content_types().clone()),
            ))
    }

    async fn check_destination(&self) -> Result<(), ImportError> {
        let destination = self.job.destination();
        match tokio::fs::metadata(destination).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(ImportError::invalid_destination(destination, "not a directory")),
            Err(e) => Err(ImportError::invalid_destination(destination, e.to_string())),
        }
    }
}
