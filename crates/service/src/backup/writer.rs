use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use sea_orm::sea_query::{Alias, Expr, Order, Query};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{debug, info};

use models::WorkspaceId;

use super::archive::{self, BackupInfo, BackupMetadata, Row, TableDump, FORMAT_VERSION, TIMESTAMP_FORMAT};
use super::errors::BackupError;
use super::locks::ScopeLocks;
use super::schema::SchemaDescriptor;
use super::{naming, uploads, values, BackupPaths};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// `None` backs up every workspace.
    pub workspace_id: Option<WorkspaceId>,
    pub include_uploads: bool,
    /// Restrict the dump to these tables.
    pub tables: Option<Vec<String>>,
    pub name: Option<String>,
}

impl Default for BackupRequest {
    fn default() -> Self {
        Self { workspace_id: None, include_uploads: true, tables: None, name: None }
    }
}

impl BackupRequest {
    pub fn workspace(id: WorkspaceId) -> Self {
        Self { workspace_id: Some(id), ..Self::default() }
    }
}

/// Builds archives. The archive is assembled in a hidden temp file inside
/// the backup directory and only then linked under its final name.
#[derive(Clone)]
pub struct Writer {
    db: DatabaseConnection,
    paths: BackupPaths,
    schema: Arc<SchemaDescriptor>,
    locks: Arc<ScopeLocks>,
}

impl Writer {
    pub fn new(db: DatabaseConnection, paths: BackupPaths, schema: Arc<SchemaDescriptor>, locks: Arc<ScopeLocks>) -> Self {
        Self { db, paths, schema, locks }
    }

    pub async fn create(&self, request: BackupRequest) -> Result<BackupInfo, BackupError> {
        let _guard = self.locks.acquire(request.workspace_id).await;

        let dump = dump_tables(&self.db, &self.schema, request.workspace_id, request.tables.as_deref()).await?;

        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let backup_id = naming::new_backup_id();
        let filename = naming::archive_filename(request.name.as_deref(), request.workspace_id, &timestamp, &backup_id);
        let metadata = BackupMetadata {
            backup_id,
            timestamp,
            workspace_id: request.workspace_id,
            include_uploads: request.include_uploads,
            tables: request.tables,
            version: FORMAT_VERSION.to_string(),
        };

        let backup_dir = self.paths.backup_dir.clone();
        let uploads_dir = self.paths.uploads_dir.clone();
        let meta = metadata.clone();
        let name = filename.clone();
        let (path, size, uploads) = tokio::task::spawn_blocking(move || -> Result<(PathBuf, u64, usize), BackupError> {
            fs::create_dir_all(&backup_dir)?;
            let staged = if meta.include_uploads {
                uploads::collect(&uploads_dir, meta.workspace_id)?
            } else {
                Vec::new()
            };

            let mut tmp = tempfile::Builder::new()
                .prefix(".backup-")
                .suffix(".partial")
                .tempfile_in(&backup_dir)?;
            archive::write_archive(tmp.as_file_mut(), &dump, &meta, &staged)?;
            tmp.as_file().sync_all()?;

            let target = backup_dir.join(&name);
            let file = tmp.persist_noclobber(&target).map_err(|e| BackupError::Io(e.error))?;
            let size = file.metadata()?.len();
            let path = fs::canonicalize(&target).unwrap_or(target);
            Ok((path, size, staged.len()))
        })
        .await??;

        info!(
            file = %filename,
            workspace_id = ?metadata.workspace_id,
            size,
            uploads,
            "backup created"
        );
        Ok(BackupInfo::from_metadata(metadata, filename, path, size))
    }
}

/// Select the described columns of every chosen table, narrowed to one
/// workspace when `workspace_id` is set. Rows come out in primary-key order.
pub async fn dump_tables<C: ConnectionTrait>(
    db: &C,
    schema: &SchemaDescriptor,
    workspace_id: Option<WorkspaceId>,
    requested: Option<&[String]>,
) -> Result<TableDump, BackupError> {
    let backend = db.get_database_backend();
    let mut dump = TableDump::new();
    for table in schema.select(requested) {
        let mut select = Query::select();
        select
            .columns(table.columns.iter().map(|c| Alias::new(c.name)))
            .from(Alias::new(table.name))
            .order_by(Alias::new(table.primary_key), Order::Asc);
        if let (Some(id), Some(column)) = (workspace_id, table.filter_column()) {
            select.and_where(Expr::col(Alias::new(column)).eq(id));
        }

        let rows = db.query_all(backend.build(&select)).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = Row::new();
            for column in &table.columns {
                record.insert(column.name.to_string(), values::read_column(row, column)?);
            }
            records.push(record);
        }
        debug!(table = table.name, rows = records.len(), "table dumped");
        dump.insert(table.name.to_string(), records);
    }
    Ok(dump)
}
