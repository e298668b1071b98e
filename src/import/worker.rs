//! Worker tasks: fetch, decode, age-check and persist one item at a time.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

use super::age_gate::{AgeDecision, AgeGate};
use super::coordinator::RunCoordinator;
use super::persist::persist_item;
use super::{ImportError, ImportJob, ImportStats, RemoteItem, UndatedPolicy};
use crate::decode::CaptureTimeDecoder;
use crate::transport::CameraClient;

/// Receiving half of the work queue, shared by every worker of a run.
pub(super) type SharedQueue = Arc<Mutex<mpsc::Receiver<RemoteItem>>>;

/// Everything a worker needs, shared by all workers of a run.
#[derive(Debug)]
pub(super) struct WorkerContext {
    pub(super) client: CameraClient,
    pub(super) decoder: Arc<dyn CaptureTimeDecoder>,
    pub(super) job: Arc<ImportJob>,
    pub(super) gate: AgeGate,
    /// Reference instant for the age gate, fixed at run start.
    pub(super) started_at: DateTime<Utc>,
    pub(super) coordinator: Arc<RunCoordinator>,
    pub(super) stats: Arc<ImportStats>,
}

/// What happened to one dequeued item.
#[derive(Debug)]
enum ItemOutcome {
    Persisted(PathBuf),
    /// No timestamp and the job skips undated items.
    Undated,
    /// Older than the retention window; the run is soft-stopped.
    TooOld,
    /// Cancellation was observed before anything was written.
    Abandoned,
}

/// Consumes items until the queue closes or the run is cancelled.
#[instrument(skip(ctx, queue))]
pub(super) async fn run_worker(worker: usize, ctx: Arc<WorkerContext>, queue: SharedQueue) {
    let token = ctx.coordinator.token().clone();

    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => None,
            item = async { queue.lock().await.recv().await } => item,
        };
        let Some(item) = next else {
            break;
        };

        debug!(item = %item.id, "worker picked item");
        match process_item(&ctx, item).await {
            Ok(ItemOutcome::Persisted(_)) => ctx.stats.increment_persisted(),
            Ok(ItemOutcome::Undated) => ctx.stats.increment_undated(),
            Ok(ItemOutcome::TooOld | ItemOutcome::Abandoned) => break,
            Err(e) => {
                warn!(error = %e, "worker stopping on error");
                ctx.coordinator.fail(e);
                break;
            }
        }
    }

    debug!("worker exiting");
}

async fn process_item(ctx: &WorkerContext, mut item: RemoteItem) -> Result<ItemOutcome, ImportError> {
    let token = ctx.coordinator.token();

    let body = tokio::select! {
        biased;
        () = token.cancelled() => return Ok(ItemOutcome::Abandoned),
        body = ctx.client.fetch_item(item.id.as_str()) => {
            body.map_err(|e| ImportError::fetch(item.id.as_str(), e))?
        }
    };

    let captured_at = match ctx.decoder.capture_time(&body) {
        Ok(captured_at) => captured_at,
        Err(e) => match ctx.job.undated_policy() {
            UndatedPolicy::Abort => return Err(ImportError::decode(item.id.as_str(), e)),
            UndatedPolicy::Skip => {
                warn!(item = %item.id, error = %e, "no capture time, skipping item");
                return Ok(ItemOutcome::Undated);
            }
        },
    };
    item.captured_at = Some(captured_at);

    if let AgeDecision::TooOld { cutoff } = ctx.gate.check(captured_at, ctx.started_at) {
        info!(
            item = %item.id,
            captured_at = %captured_at,
            cutoff = %cutoff,
            "item older than retention window, stopping import"
        );
        ctx.coordinator.soft_stop();
        return Ok(ItemOutcome::TooOld);
    }

    if token.is_cancelled() {
        debug!(item = %item.id, "cancelled before write, dropping item");
        return Ok(ItemOutcome::Abandoned);
    }

    let path = persist_item(ctx.job.destination(), &item, &body).await?;
    Ok(ItemOutcome::Persisted(path))
}
