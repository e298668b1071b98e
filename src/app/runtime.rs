use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result, bail};
use olyshare_core::{
    Camera, CameraClient, CaptureTimeDecoder, ExifDecoder, ImportStats, Importer, ResponseCache,
    RunOutcome,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config_runtime::{build_import_job, cache_dir};
use super::{progress_manager, terminal};
use crate::cli::Args;

pub(crate) async fn run_import(args: &Args) -> Result<()> {
    // The output directory is checked by the importer itself.
    let job = build_import_job(args);

    let cache = match cache_dir(args) {
        Some(dir) => {
            ensure_existing_dir(&dir)
                .await
                .with_context(|| format!("Cache directory '{}' is not usable", dir.display()))?;
            Some(ResponseCache::new(dir))
        }
        None => {
            debug!("response cache disabled");
            None
        }
    };

    let client =
        CameraClient::with_timeouts(&args.cam_ip, cache, args.connect_timeout, args.read_timeout)
            .with_context(|| format!("Invalid camera address '{}'", args.cam_ip))?;
    let camera = Camera::new(args.cam_ip.clone(), args.image_dir.clone());
    let decoder: Arc<dyn CaptureTimeDecoder> = Arc::new(ExifDecoder::new());
    let importer = Importer::new(job, client, decoder);

    let interrupt = CancellationToken::new();
    spawn_signal_handlers(&interrupt);

    let stats = Arc::new(ImportStats::new());
    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) =
        progress_manager::spawn_progress_ui(use_spinner, Arc::clone(&stats));

    info!(camera = %camera.listing_url(), "Import starting");
    let result = importer
        .run_with_stats(&camera, &interrupt, Arc::clone(&stats))
        .await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }

    let summary = result?;
    match summary.outcome {
        RunOutcome::CutoffReached => info!(
            days = importer.job().retention_days(),
            "Reached files older than the retention window"
        ),
        RunOutcome::Completed => debug!("listing exhausted"),
    }
    info!(
        imported = summary.persisted,
        skipped = summary.skipped,
        undated = summary.undated,
        listed = summary.listed,
        "Import complete"
    );
    Ok(())
}

/// Fails unless `dir` exists and is a directory. Nothing is created.
async fn ensure_existing_dir(dir: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(dir)
        .await
        .with_context(|| format!("'{}' does not exist", dir.display()))?;
    if !meta.is_dir() {
        bail!("'{}' is not a directory", dir.display());
    }
    Ok(())
}

/// Cancels `interrupt` on Ctrl-C, and on SIGHUP where available.
fn spawn_signal_handlers(interrupt: &CancellationToken) {
    let token = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping import");
            token.cancel();
        }
    });
    spawn_hangup_handler(interrupt.clone());
}

#[cfg(unix)]
fn spawn_hangup_handler(token: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                debug!(error = %e, "cannot listen for SIGHUP");
                return;
            }
        };
        if hangup.recv().await.is_some() {
            warn!("Hangup received, stopping import");
            token.cancel();
        }
    });
}

#[cfg(not(unix))]
fn spawn_hangup_handler(_token: CancellationToken) {}
