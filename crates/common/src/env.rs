//! Environment/runtime helpers
//!
//! Sanity checks to ensure the backup and upload roots exist at startup.

use std::path::Path;

use tracing::{info, warn};

/// Ensure the archive directory exists and warn when the uploads root is missing.
///
/// The uploads root is only read by backups and written by restores, so a
/// missing one is not fatal; the archive directory is created eagerly.
pub async fn ensure_env(backup_dir: &Path, uploads_dir: &Path) -> anyhow::Result<()> {
    if tokio::fs::metadata(uploads_dir).await.is_err() {
        warn!(uploads_dir = %uploads_dir.display(), "uploads directory not found; backups will contain no files");
    }
    tokio::fs::create_dir_all(backup_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", backup_dir.display()))?;
    info!(backup_dir = %backup_dir.display(), "backup directory ready");
    Ok(())
}
