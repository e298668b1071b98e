//! Integration tests for the import pipeline.
//!
//! Each test runs [`Importer`] against a wiremock camera and a temporary
//! destination directory.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use olyshare_core::{
    Camera, CameraClient, CaptureTimeDecoder, DecodeError, ImportError, ImportJob, ImportSummary,
    Importer, ResponseCache, RunOutcome, UndatedPolicy,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::camera::{
    IMAGE_DIR, Rfc3339Decoder, item_id, mount_head, mount_item, mount_listing, taken_hours_ago,
};
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

fn importer(server: &MockServer, job: ImportJob, cache: Option<ResponseCache>) -> Importer {
    let client = CameraClient::new(&server.uri(), cache).unwrap();
    Importer::new(job, client, Arc::new(Rfc3339Decoder))
}

fn camera(server: &MockServer) -> Camera {
    Camera::new(server.uri(), IMAGE_DIR)
}

async fn run(
    server: &MockServer,
    job: ImportJob,
    cache: Option<ResponseCache>,
) -> Result<ImportSummary, ImportError> {
    importer(server, job, cache)
        .run(&camera(server), &CancellationToken::new())
        .await
}

#[derive(Debug)]
struct PanickingDecoder;

impl CaptureTimeDecoder for PanickingDecoder {
    fn capture_time(&self, _body: &[u8]) -> Result<DateTime<Utc>, DecodeError> {
        panic!("decoder blew up");
    }
}

fn files_in(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ==================== Retention Cutoff ====================

#[tokio::test]
async fn test_cutoff_stops_import_before_older_items_are_fetched() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    // Camera order is oldest first; the importer walks it newest first.
    mount_listing(&server, &["c.JPG", "b.JPG", "a.JPG"]).await;
    mount_item(&server, "a.JPG", taken_hours_ago(2), 1).await;
    mount_item(&server, "b.JPG", taken_hours_ago(25), 1).await;
    mount_item(&server, "c.JPG", taken_hours_ago(48), 0).await;

    let job = ImportJob::new(dest.path()).with_retention_days(1).with_workers(1);
    let summary = run(&server, job, None).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::CutoffReached);
    assert_eq!(summary.listed, 3);
    assert_eq!(summary.persisted, 1);
    assert_eq!(files_in(&dest), vec!["a.JPG"]);
}

#[tokio::test]
async fn test_non_positive_retention_imports_everything() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["old.JPG", "new.JPG"]).await;
    mount_item(&server, "old.JPG", taken_hours_ago(24 * 365), 1).await;
    mount_item(&server, "new.JPG", taken_hours_ago(1), 1).await;

    let job = ImportJob::new(dest.path()).with_retention_days(0);
    let summary = run(&server, job, None).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.persisted, 2);
    assert_eq!(files_in(&dest), vec!["new.JPG", "old.JPG"]);
}

// ==================== Filters ====================

#[tokio::test]
async fn test_rerun_skips_already_present_files_without_fetching() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["b.JPG", "a.JPG"]).await;
    // Exactly one GET each across both runs.
    mount_item(&server, "a.JPG", taken_hours_ago(1), 1).await;
    mount_item(&server, "b.JPG", taken_hours_ago(2), 1).await;

    let first = run(&server, ImportJob::new(dest.path()), None).await.unwrap();
    assert_eq!(first.persisted, 2);

    let second = run(&server, ImportJob::new(dest.path()), None).await.unwrap();
    assert_eq!(second.outcome, RunOutcome::Completed);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.admitted, 0);
    assert_eq!(second.persisted, 0);
    assert_eq!(files_in(&dest), vec!["a.JPG", "b.JPG"]);
}

#[tokio::test]
async fn test_excluded_content_types_are_never_fetched() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["c.ORF", "b.MOV", "a.JPG"]).await;
    mount_head(&server, "a.JPG", "image/jpeg").await;
    mount_head(&server, "b.MOV", "video/quicktime").await;
    mount_head(&server, "c.ORF", "image/x-olympus-orf").await;
    mount_item(&server, "a.JPG", taken_hours_ago(1), 1).await;
    mount_item(&server, "b.MOV", taken_hours_ago(2), 0).await;
    mount_item(&server, "c.ORF", taken_hours_ago(3), 1).await;

    let job = ImportJob::new(dest.path()).exclude_content_types(["Video/QuickTime"]);
    let summary = run(&server, job, None).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(files_in(&dest), vec!["a.JPG", "c.ORF"]);
}

#[tokio::test]
async fn test_failed_probe_skips_item() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["b.JPG", "a.JPG"]).await;
    mount_head(&server, "a.JPG", "image/jpeg").await;
    Mock::given(method("HEAD"))
        .and(path(item_id("b.JPG")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_item(&server, "a.JPG", taken_hours_ago(1), 1).await;
    mount_item(&server, "b.JPG", taken_hours_ago(2), 0).await;

    let job = ImportJob::new(dest.path()).exclude_content_types(["video/quicktime"]);
    let summary = run(&server, job, None).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.skipped, 1);
    assert_eq!(files_in(&dest), vec!["a.JPG"]);
}

#[tokio::test]
async fn test_failed_probe_skips_item_without_exclusions() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["a.JPG"]).await;
    Mock::given(method("HEAD"))
        .and(path(item_id("a.JPG")))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_item(&server, "a.JPG", taken_hours_ago(1), 0).await;

    let summary = run(&server, ImportJob::new(dest.path()), None).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.persisted, 0);
    assert!(files_in(&dest).is_empty());
}

#[tokio::test]
async fn test_duplicate_listing_entries_are_written_once() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["a.JPG", "b.JPG", "a.JPG"]).await;
    mount_item(&server, "a.JPG", taken_hours_ago(1), 1).await;
    mount_item(&server, "b.JPG", taken_hours_ago(1), 1).await;

    let job = ImportJob::new(dest.path()).with_workers(4);
    let summary = run(&server, job, None).await.unwrap();

    assert_eq!(summary.listed, 3);
    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.persisted, 2);
}

// ==================== Worker Pool ====================

#[tokio::test]
async fn test_all_workers_drain_a_fresh_listing() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    let names = ["f.JPG", "e.JPG", "d.JPG", "c.JPG", "b.JPG", "a.JPG"];
    mount_listing(&server, &names).await;
    for name in names {
        mount_item(&server, name, taken_hours_ago(1), 1).await;
    }

    let job = ImportJob::new(dest.path()).with_workers(4);
    let summary = run(&server, job, None).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.persisted, names.len());
    assert_eq!(files_in(&dest).len(), names.len());
}

#[tokio::test]
async fn test_cached_bodies_are_not_fetched_twice() {
    let server = require_mock_server!();
    let cache_dir = TempDir::new().unwrap();

    mount_listing(&server, &["a.JPG"]).await;
    mount_item(&server, "a.JPG", taken_hours_ago(1), 1).await;

    for _ in 0..2 {
        let dest = TempDir::new().unwrap();
        let cache = ResponseCache::new(cache_dir.path());
        let summary = run(&server, ImportJob::new(dest.path()), Some(cache))
            .await
            .unwrap();
        assert_eq!(summary.persisted, 1);
        assert_eq!(files_in(&dest), vec!["a.JPG"]);
    }
}

// ==================== Failures ====================

#[tokio::test]
async fn test_listing_failure_is_fatal() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/get_imglist.cgi"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = run(&server, ImportJob::new(dest.path()), None).await;

    assert!(matches!(result, Err(ImportError::Listing(_))), "got {result:?}");
}

#[tokio::test]
async fn test_fetch_failure_fails_run() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["a.JPG"]).await;
    Mock::given(method("GET"))
        .and(path(item_id("a.JPG")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = run(&server, ImportJob::new(dest.path()), None).await;

    match result {
        Err(ImportError::Fetch { item, .. }) => assert_eq!(item, item_id("a.JPG")),
        other => panic!("Expected fetch error, got: {other:?}"),
    }
    assert!(files_in(&dest).is_empty());
}

#[tokio::test]
async fn test_persist_failure_fails_run_without_final_file() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["a.JPG"]).await;
    mount_item(&server, "a.JPG", taken_hours_ago(1), 1).await;
    std::fs::create_dir(dest.path().join(".a.JPG.part")).unwrap();

    let result = run(&server, ImportJob::new(dest.path()), None).await;

    assert!(matches!(result, Err(ImportError::Persist { .. })), "got {result:?}");
    assert!(!dest.path().join("a.JPG").exists());
}

#[tokio::test]
async fn test_persist_failure_halts_remaining_work() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["c.JPG", "b.JPG", "a.JPG"]).await;
    mount_item(&server, "a.JPG", taken_hours_ago(1), 1).await;
    mount_item(&server, "b.JPG", taken_hours_ago(2), 0).await;
    mount_item(&server, "c.JPG", taken_hours_ago(3), 0).await;
    std::fs::create_dir(dest.path().join(".a.JPG.part")).unwrap();

    let job = ImportJob::new(dest.path()).with_workers(1);
    let result = run(&server, job, None).await;

    match result {
        Err(ImportError::Persist { path, .. }) => assert_eq!(path, dest.path().join("a.JPG")),
        other => panic!("Expected persist error, got: {other:?}"),
    }
    assert_eq!(files_in(&dest), vec![".a.JPG.part"]);
}

#[tokio::test]
async fn test_panicking_workers_fail_run_instead_of_hanging() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    let names = ["d.JPG", "c.JPG", "b.JPG", "a.JPG"];
    mount_listing(&server, &names).await;
    for name in names {
        Mock::given(method("GET"))
            .and(path(item_id(name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(taken_hours_ago(1)))
            .mount(&server)
            .await;
    }

    let client = CameraClient::new(&server.uri(), None).unwrap();
    let job = ImportJob::new(dest.path()).with_workers(1);
    let importer = Importer::new(job, client, Arc::new(PanickingDecoder));

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        importer.run(&camera(&server), &CancellationToken::new()),
    )
    .await
    .expect("run should finish once every worker is gone");

    assert!(matches!(result, Err(ImportError::Worker(_))), "got {result:?}");
    assert!(files_in(&dest).is_empty());
}

#[tokio::test]
async fn test_undated_item_aborts_by_default() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["a.JPG"]).await;
    mount_item(&server, "a.JPG", "not an image".to_string(), 1).await;

    let result = run(&server, ImportJob::new(dest.path()), None).await;

    assert!(matches!(result, Err(ImportError::Decode { .. })), "got {result:?}");
    assert!(files_in(&dest).is_empty());
}

#[tokio::test]
async fn test_undated_item_is_skipped_when_allowed() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["b.JPG", "a.JPG"]).await;
    mount_item(&server, "a.JPG", "not an image".to_string(), 1).await;
    mount_item(&server, "b.JPG", taken_hours_ago(1), 1).await;

    let job = ImportJob::new(dest.path())
        .with_workers(1)
        .with_undated_policy(UndatedPolicy::Skip);
    let summary = run(&server, job, None).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.undated, 1);
    assert_eq!(files_in(&dest), vec!["b.JPG"]);
}

#[tokio::test]
async fn test_missing_destination_is_rejected_before_listing() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();
    let missing = dest.path().join("not-there");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = run(&server, ImportJob::new(&missing), None).await;

    assert!(
        matches!(result, Err(ImportError::InvalidDestination { .. })),
        "got {result:?}"
    );
}

// ==================== Interrupts ====================

#[tokio::test]
async fn test_interrupt_before_start_writes_nothing() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let interrupt = CancellationToken::new();
    interrupt.cancel();
    let result = importer(&server, ImportJob::new(dest.path()), None)
        .run(&camera(&server), &interrupt)
        .await;

    assert!(matches!(result, Err(ImportError::Interrupted)), "got {result:?}");
    assert!(files_in(&dest).is_empty());
}

#[tokio::test]
async fn test_interrupt_during_fetch_stops_without_writing() {
    let server = require_mock_server!();
    let dest = TempDir::new().unwrap();

    mount_listing(&server, &["b.JPG", "a.JPG"]).await;
    for name in ["a.JPG", "b.JPG"] {
        Mock::given(method("GET"))
            .and(path(item_id(name)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(taken_hours_ago(1))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
    }

    let interrupt = CancellationToken::new();
    let trigger = interrupt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let result = importer(&server, ImportJob::new(dest.path()), None)
        .run(&camera(&server), &interrupt)
        .await;

    assert!(matches!(result, Err(ImportError::Interrupted)), "got {result:?}");
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "interrupt should not wait for the slow fetch"
    );
    assert!(files_in(&dest).is_empty());
}
