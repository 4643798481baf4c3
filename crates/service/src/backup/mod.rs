//! Workspace backup and restore.
//!
//! - [`Writer`] dumps the tables of a [`SchemaDescriptor`] (optionally for
//!   one workspace) plus upload files into a zip archive.
//! - [`Catalog`] lists the archives in the backup directory.
//! - [`Restorer`] replays an archive inside one database transaction.
//! - [`Deleter`] removes archive files.
//!
//! [`BackupService`] wires the four together over one database handle and
//! one pair of directory roots.

pub mod archive;
pub mod catalog;
pub mod deleter;
pub mod errors;
pub mod locks;
pub mod naming;
pub mod restorer;
pub mod schedule;
pub mod schema;
pub mod uploads;
pub mod values;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sea_orm::DatabaseConnection;

use models::WorkspaceId;

pub use archive::{BackupInfo, BackupMetadata, TableDump};
pub use catalog::Catalog;
pub use deleter::Deleter;
pub use errors::BackupError;
pub use locks::ScopeLocks;
pub use restorer::{RestoreReport, RestoreRequest, Restorer, TableReport};
pub use schedule::{BackupScheduler, ScheduledRun};
pub use schema::{ColumnDescriptor, ColumnKind, SchemaDescriptor, TableDescriptor, TableScope};
pub use writer::{BackupRequest, Writer};

/// Directory roots shared by every backup component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    pub backup_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

impl BackupPaths {
    pub fn from_config(cfg: &configs::BackupConfig) -> Self {
        Self { backup_dir: cfg.backup_dir.clone(), uploads_dir: cfg.uploads_dir.clone() }
    }
}

#[derive(Clone)]
pub struct BackupService {
    paths: BackupPaths,
    writer: Writer,
    catalog: Catalog,
    restorer: Restorer,
    deleter: Deleter,
}

impl BackupService {
    pub fn new(db: DatabaseConnection, paths: BackupPaths, schema: SchemaDescriptor) -> Self {
        let schema = Arc::new(schema);
        let locks = Arc::new(ScopeLocks::new());
        Self {
            writer: Writer::new(db.clone(), paths.clone(), Arc::clone(&schema), Arc::clone(&locks)),
            restorer: Restorer::new(db, paths.clone(), schema, locks),
            catalog: Catalog::new(paths.backup_dir.clone()),
            deleter: Deleter,
            paths,
        }
    }

    pub fn paths(&self) -> &BackupPaths {
        &self.paths
    }

    pub async fn create(&self, request: BackupRequest) -> Result<BackupInfo, BackupError> {
        self.writer.create(request).await
    }

    pub async fn list(&self, workspace_id: Option<WorkspaceId>) -> Result<Vec<BackupInfo>, BackupError> {
        self.catalog.list(workspace_id).await
    }

    pub async fn restore(&self, archive_path: &Path, request: RestoreRequest) -> bool {
        self.restorer.restore(archive_path, request).await
    }

    pub async fn try_restore(&self, archive_path: &Path, request: RestoreRequest) -> Result<RestoreReport, BackupError> {
        self.restorer.try_restore(archive_path, request).await
    }

    pub async fn delete(&self, archive_path: &Path) -> bool {
        self.deleter.delete(archive_path).await
    }

    pub async fn try_delete(&self, archive_path: &Path) -> Result<(), BackupError> {
        self.deleter.try_delete(archive_path).await
    }

    /// Path of an archive in the backup directory, by bare file name.
    pub fn archive_path(&self, filename: &str) -> Result<PathBuf, BackupError> {
        if !naming::is_archive_filename(filename) {
            return Err(BackupError::NotFound(filename.to_string()));
        }
        Ok(self.paths.backup_dir.join(filename))
    }
}

#[cfg(test)]
mod tests;
