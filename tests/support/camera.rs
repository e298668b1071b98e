//! A fake camera served by wiremock.
//!
//! Item bodies are RFC 3339 timestamps and [`Rfc3339Decoder`] reads them
//! back, so tests control capture times without building image files.

use chrono::{DateTime, TimeDelta, Utc};
use olyshare_core::{CaptureTimeDecoder, DecodeError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const IMAGE_DIR: &str = "/DCIM/100OLYMP";

/// Decoder that parses the whole body as an RFC 3339 timestamp.
#[derive(Debug)]
pub struct Rfc3339Decoder;

impl CaptureTimeDecoder for Rfc3339Decoder {
    fn capture_time(&self, body: &[u8]) -> Result<DateTime<Utc>, DecodeError> {
        let text = String::from_utf8_lossy(body);
        DateTime::parse_from_rfc3339(text.trim())
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| DecodeError::MissingTimestamp)
    }
}

/// Body for an item captured `hours` ago.
pub fn taken_hours_ago(hours: i64) -> String {
    (Utc::now() - TimeDelta::hours(hours)).to_rfc3339()
}

/// Full identifier of `name` in the default image folder.
pub fn item_id(name: &str) -> String {
    format!("{IMAGE_DIR}/{name}")
}

/// Serves a listing with `names` in camera order (oldest first).
///
/// Every item also answers `HEAD` with `image/jpeg` unless a test mounts
/// its own probe response with [`mount_head`].
pub async fn mount_listing(server: &MockServer, names: &[&str]) {
    let mut body = String::from("VER_100\r\n");
    for (index, name) in names.iter().enumerate() {
        body.push_str(&format!(
            "{IMAGE_DIR},{name},{},0,{},{}\r\n",
            1_000 + index,
            20_000 + index,
            30_000 + index
        ));
    }
    Mock::given(method("GET"))
        .and(path("/get_imglist.cgi"))
        .and(query_param("DIR", IMAGE_DIR))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/jpeg"))
        .with_priority(u8::MAX)
        .mount(server)
        .await;
}

/// Serves `GET <id>` with `body`, expecting exactly `expected_gets` requests.
pub async fn mount_item(server: &MockServer, name: &str, body: String, expected_gets: u64) {
    Mock::given(method("GET"))
        .and(path(item_id(name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_gets)
        .mount(server)
        .await;
}

/// Serves `HEAD <id>` with the given content type.
pub async fn mount_head(server: &MockServer, name: &str, content_type: &str) {
    Mock::given(method("HEAD"))
        .and(path(item_id(name)))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", content_type))
        .mount(server)
        .await;
}
