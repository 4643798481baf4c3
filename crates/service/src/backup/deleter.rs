use std::io;
use std::path::Path;

use tracing::{error, info};

use super::errors::BackupError;

/// Removes archive files. Callers drop any records that point at them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deleter;

impl Deleter {
    /// `false` (logged) when the file is missing or cannot be removed.
    pub async fn delete(&self, archive_path: &Path) -> bool {
        match self.try_delete(archive_path).await {
            Ok(()) => true,
            Err(e) => {
                error!(archive = %archive_path.display(), error = %e, "backup delete failed");
                false
            }
        }
    }

    pub async fn try_delete(&self, archive_path: &Path) -> Result<(), BackupError> {
        match tokio::fs::remove_file(archive_path).await {
            Ok(()) => {
                info!(archive = %archive_path.display(), "backup deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(BackupError::NotFound(archive_path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_delete_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.zip");
        std::fs::write(&path, b"zip").unwrap();

        assert!(Deleter.delete(&path).await);
        assert!(!path.exists());
        assert!(!Deleter.delete(&path).await);
        assert!(matches!(Deleter.try_delete(&path).await, Err(BackupError::NotFound(_))));
    }
}
