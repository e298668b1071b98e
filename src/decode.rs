//! Capture-time extraction from image bytes.
//!
//! The importer only needs one fact from a downloaded file: when it was taken.
//! [`CaptureTimeDecoder`] is that capability; [`ExifDecoder`] implements it by
//! reading EXIF `DateTimeOriginal`, falling back to the IFD0 `DateTime`.
//!
//! The decoder is built once at startup and handed to the importer, so tests
//! can swap in a decoder that does not need real image files.

use std::fmt;
use std::io::Cursor;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use exif::{In, Tag, Value};
use thiserror::Error;

/// Errors raised while extracting a capture time.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes do not contain readable EXIF data.
    #[error("no readable EXIF data: {0}")]
    Exif(#[from] exif::Error),

    /// EXIF data is present but carries no usable timestamp tag.
    #[error("no capture timestamp in EXIF data")]
    MissingTimestamp,

    /// A timestamp tag was found but does not describe a real local time.
    #[error("invalid capture timestamp {value:?}")]
    InvalidTimestamp {
        /// The raw tag value.
        value: String,
    },
}

/// Extracts the moment an item was captured from its full body.
pub trait CaptureTimeDecoder: Send + Sync + fmt::Debug {
    /// Returns the capture time of `body`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when no timestamp can be extracted.
    fn capture_time(&self, body: &[u8]) -> Result<DateTime<Utc>, DecodeError>;
}

/// EXIF-backed decoder.
///
/// Tags are consulted in order; the first one that parses wins. EXIF times
/// carry no zone, so they are read as the host's local time.
#[derive(Debug, Clone)]
pub struct ExifDecoder {
    tags: Vec<Tag>,
}

impl Default for ExifDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExifDecoder {
    /// Creates a decoder reading `DateTimeOriginal`, then `DateTime`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tags: vec![Tag::DateTimeOriginal, Tag::DateTime],
        }
    }
}

impl CaptureTimeDecoder for ExifDecoder {
    fn capture_time(&self, body: &[u8]) -> Result<DateTime<Utc>, DecodeError> {
        let exif = exif::Reader::new().read_from_container(&mut Cursor::new(body))?;

        let mut last_invalid = None;
        for tag in &self.tags {
            let Some(field) = exif.get_field(*tag, In::PRIMARY) else {
                continue;
            };
            let Value::Ascii(ref values) = field.value else {
                continue;
            };
            let Some(raw) = values.first() else {
                continue;
            };
            match parse_exif_datetime(raw) {
                Ok(taken) => return Ok(taken),
                Err(e) => last_invalid = Some(e),
            }
        }

        Err(last_invalid.unwrap_or(DecodeError::MissingTimestamp))
    }
}

fn parse_exif_datetime(raw: &[u8]) -> Result<DateTime<Utc>, DecodeError> {
    let invalid = || DecodeError::InvalidTimestamp {
        value: String::from_utf8_lossy(raw).into_owned(),
    };

    let parsed = exif::DateTime::from_ascii(raw).map_err(|_| invalid())?;
    let naive = NaiveDate::from_ymd_opt(
        i32::from(parsed.year),
        u32::from(parsed.month),
        u32::from(parsed.day),
    )
    .and_then(|date| {
        date.and_hms_opt(
            u32::from(parsed.hour),
            u32::from(parsed.minute),
            u32::from(parsed.second),
        )
    })
    .ok_or_else(invalid)?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(invalid)
}
