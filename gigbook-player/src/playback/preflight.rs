//! Local media checks run before handing a reference to the backend
//!
//! Native backends report missing or truncated files with vague decoder
//! errors; checking the filesystem first gives the classifier an exact
//! cause for the common cases.

use crate::backend::BackendFailure;
use gigbook_common::MediaReference;
use std::io::ErrorKind;
use tracing::debug;

/// Check a reference that resolves to a local file
///
/// Opaque references (no local path) pass untouched.
pub async fn check_local_media(reference: &MediaReference, min_bytes: u64) -> Result<(), BackendFailure> {
    let Some(path) = reference.local_path() else {
        return Ok(());
    };

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(BackendFailure::NotFound {
                detail: path.display().to_string(),
            });
        }
        Err(e) => {
            return Err(BackendFailure::Io {
                detail: format!("{}: {}", path.display(), e),
            });
        }
    };

    if !metadata.is_file() {
        return Err(BackendFailure::Unreadable {
            detail: format!("{} is not a regular file", path.display()),
        });
    }
    if metadata.len() < min_bytes {
        return Err(BackendFailure::Unreadable {
            detail: format!("{} is only {} bytes", path.display(), metadata.len()),
        });
    }

    debug!("Preflight ok: {} ({} bytes)", path.display(), metadata.len());
    Ok(())
}
