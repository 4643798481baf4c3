use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use models::WorkspaceId;

use super::archive::{self, BackupInfo};
use super::errors::BackupError;

/// Read-only view over the archives in the backup directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    backup_dir: PathBuf,
}

impl Catalog {
    pub fn new(backup_dir: PathBuf) -> Self {
        Self { backup_dir }
    }

    /// Archives newest first, optionally only those of one workspace.
    /// Files without readable metadata are logged and left out.
    pub async fn list(&self, workspace_id: Option<WorkspaceId>) -> Result<Vec<BackupInfo>, BackupError> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let dir = self.backup_dir.clone();
        let mut found = tokio::task::spawn_blocking(move || scan(&dir)).await??;
        if let Some(id) = workspace_id {
            found.retain(|b| b.workspace_id == Some(id));
        }
        sort_newest_first(&mut found);
        Ok(found)
    }
}

fn scan(dir: &Path) -> Result<Vec<BackupInfo>, BackupError> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("zip") {
            continue;
        }
        let filename = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        // the file may be deleted between read_dir and here
        let stat = match fs::metadata(&path) {
            Ok(stat) => stat,
            Err(e) => {
                warn!(file = %filename, error = %e, "backup archive vanished while listing");
                continue;
            }
        };
        if !stat.is_file() {
            continue;
        }
        match archive::read_metadata(&path) {
            Ok(metadata) => found.push(BackupInfo::from_metadata(metadata, filename, path, stat.len())),
            Err(e) => warn!(file = %filename, error = %e, "skipping invalid backup archive"),
        }
    }
    Ok(found)
}

/// Descending by creation time; unparsable timestamps sort last.
pub fn sort_newest_first(backups: &mut [BackupInfo]) {
    backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::{BackupMetadata, TableDump, FORMAT_VERSION};

    fn write(dir: &Path, filename: &str, timestamp: &str, workspace_id: Option<i32>) {
        let metadata = BackupMetadata {
            backup_id: filename[..4].to_string(),
            timestamp: timestamp.into(),
            workspace_id,
            include_uploads: false,
            tables: None,
            version: FORMAT_VERSION.into(),
        };
        let file = fs::File::create(dir.join(filename)).unwrap();
        archive::write_archive(file, &TableDump::new(), &metadata, &[]).unwrap();
    }

    #[tokio::test]
    async fn lists_newest_first_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "old1.zip", "20230101_000000", Some(1));
        write(dir.path(), "new1.zip", "20240101_000000", Some(1));
        write(dir.path(), "bad1.zip", "yesterday", Some(1));
        write(dir.path(), "all0.zip", "20231231_235959", None);
        fs::write(dir.path().join("junk.zip"), b"nope").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let catalog = Catalog::new(dir.path().to_path_buf());
        let all: Vec<_> = catalog.list(None).await.unwrap().into_iter().map(|b| b.filename).collect();
        assert_eq!(all, vec!["new1.zip", "all0.zip", "old1.zip", "bad1.zip"]);

        let one: Vec<_> = catalog.list(Some(1)).await.unwrap().into_iter().map(|b| b.filename).collect();
        assert_eq!(one, vec!["new1.zip", "old1.zip", "bad1.zip"]);
        assert!(catalog.list(Some(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backups = dir.path().join("nested/backups");
        assert!(Catalog::new(backups.clone()).list(None).await.unwrap().is_empty());
        assert!(backups.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn entry_gone_before_stat_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "kept.zip", "20240101_000000", None);
        std::os::unix::fs::symlink(dir.path().join("deleted.zip"), dir.path().join("dangling.zip")).unwrap();

        let listed = Catalog::new(dir.path().to_path_buf()).list(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "kept.zip");
    }
}
