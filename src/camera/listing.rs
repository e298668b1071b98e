//! Parser for the camera's plaintext image listing.
//!
//! The camera answers `get_imglist.cgi` with a version line followed by one
//! row per file:
//!
//! ```text
//! VER_100
//! /DCIM/100OLYMP,P3300029.JPG,2964502,0,19582,35122
//! ```
//!
//! Only rows starting with `/` describe files. The first two fields (directory
//! and file name) form the item identifier; the remaining fields are ignored.
//! The camera lists oldest files first, so the parsed entries are returned
//! newest first. The age cutoff relies on that order.

use std::io::BufRead;

use tracing::{debug, trace};

use super::ListingEntry;

/// Parses a listing document into entries ordered newest first.
///
/// Rows that do not start with `/`, or that lack a file name field, are
/// skipped. Lines that are not valid UTF-8 are decoded lossily.
///
/// # Errors
///
/// Returns the underlying I/O error if reading `reader` fails.
pub fn parse_listing<R: BufRead>(mut reader: R) -> std::io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    let mut line = Vec::new();
    let mut line_number = 0usize;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_number += 1;

        let text = String::from_utf8_lossy(&line);
        let row = text.trim_end_matches(['\r', '\n']);
        trace!(line = line_number, row, "listing row");

        if !row.starts_with('/') {
            continue;
        }
        match parse_row(row) {
            Some(entry) => entries.push(entry),
            None => debug!(line = line_number, row, "skipping malformed listing row"),
        }
    }

    entries.reverse();
    Ok(entries)
}

/// Builds `<dirpath>/<filename>` from a listing row.
fn parse_row(row: &str) -> Option<ListingEntry> {
    let mut fields = row.split(',');
    let dir = fields.next()?;
    let name = fields.next()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(ListingEntry::new(format!("{}/{name}", dir.trim_end_matches('/'))))
}
