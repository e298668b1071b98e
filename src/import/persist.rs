//! Writes fetched items into the destination directory.
//!
//! The payload goes to a hidden sibling `.<name>.part` first, is synced to
//! disk, and is then renamed onto `<name>`. A crash or I/O error therefore
//! never leaves a truncated file under the final name, which matters because
//! the next run treats an existing final name as already imported.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{ImportError, RemoteItem};
use crate::camera::ListingEntry;

/// Returns `<destination>/<base filename of entry>`.
#[must_use]
pub fn destination_path(destination: &Path, entry: &ListingEntry) -> PathBuf {
    destination.join(entry.base_filename())
}

/// Durably writes `body` to the destination path of `item`.
///
/// # Errors
///
/// Returns [`ImportError::Persist`] if any step fails; the temporary file is
/// removed and the final path is left untouched.
pub async fn persist_item(
    destination: &Path,
    item: &RemoteItem,
    body: &[u8],
) -> Result<PathBuf, ImportError> {
    let entry = &item.id;
    let final_path = destination_path(destination, entry);
    let part_path = destination.join(format!(".{}.part", entry.base_filename()));

    if let Err(e) = write_synced(&part_path, body).await {
        debug!(path = %part_path.display(), "removing partial file after error");
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(ImportError::persist(final_path, e));
    }

    if let Err(e) = tokio::fs::rename(&part_path, &final_path).await {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(ImportError::persist(final_path, e));
    }

    info!(
        path = %final_path.display(),
        bytes = body.len(),
        captured_at = ?item.captured_at,
        content_type = item.content_type.as_deref().unwrap_or("unknown"),
        "imported file"
    );
    Ok(final_path)
}

async fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(body).await?;
    file.flush().await?;
    file.sync_all().await
}
