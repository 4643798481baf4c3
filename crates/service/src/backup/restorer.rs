use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sea_orm::sea_query::{Alias, Expr, OnConflict, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement, TransactionTrait};
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{error, info, warn};

use models::WorkspaceId;

use super::archive::{self, TableDump, UPLOADS_DIR};
use super::errors::BackupError;
use super::locks::ScopeLocks;
use super::schema::{SchemaDescriptor, TableDescriptor};
use super::{uploads, values, BackupPaths};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    /// Restore into this workspace instead of the one recorded in the archive.
    pub target_workspace_id: Option<WorkspaceId>,
    pub include_uploads: bool,
    pub tables: Option<Vec<String>>,
}

impl Default for RestoreRequest {
    fn default() -> Self {
        Self { target_workspace_id: None, include_uploads: true, tables: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub deleted: u64,
    pub inserted: u64,
    /// Identity rows left alone, tenants other than the target, and
    /// insert-if-absent rows already present.
    pub skipped: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub backup_id: String,
    pub original_workspace_id: Option<WorkspaceId>,
    pub target_workspace_id: Option<WorkspaceId>,
    pub tables: Vec<TableReport>,
    /// Tables present in the archive but unknown to the schema.
    pub skipped_tables: Vec<String>,
    pub uploads_restored: usize,
}

/// Replays archives into the database and the uploads directory.
#[derive(Clone)]
pub struct Restorer {
    db: DatabaseConnection,
    paths: BackupPaths,
    schema: Arc<SchemaDescriptor>,
    locks: Arc<ScopeLocks>,
    scratch_dir: Option<PathBuf>,
}

struct Plan<'a> {
    original: Option<WorkspaceId>,
    target: Option<WorkspaceId>,
    tables: Option<&'a [String]>,
}

impl Plan<'_> {
    fn wants(&self, table: &str) -> bool {
        self.tables.map_or(true, |t| t.iter().any(|n| n == table))
    }

    /// Rows of the tenants table are only replayed for the restore target.
    fn keeps_root_row(&self, table: &TableDescriptor, row: &archive::Row) -> bool {
        match (table.root_column(), self.target) {
            (Some(column), Some(target)) => row.get(column).and_then(Json::as_i64) == Some(i64::from(target)),
            _ => true,
        }
    }

    fn remaps(&self) -> Option<(WorkspaceId, WorkspaceId)> {
        match (self.original, self.target) {
            (Some(from), Some(to)) if from != to => Some((from, to)),
            _ => None,
        }
    }
}

impl Restorer {
    pub fn new(db: DatabaseConnection, paths: BackupPaths, schema: Arc<SchemaDescriptor>, locks: Arc<ScopeLocks>) -> Self {
        Self { db, paths, schema, locks, scratch_dir: None }
    }

    /// Extract archives under `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.scratch_dir = Some(dir);
        self
    }

    /// `true` when the database part was committed. Failures are logged.
    pub async fn restore(&self, archive_path: &Path, request: RestoreRequest) -> bool {
        match self.try_restore(archive_path, request).await {
            Ok(report) => {
                info!(
                    archive = %archive_path.display(),
                    backup_id = %report.backup_id,
                    target_workspace_id = ?report.target_workspace_id,
                    tables = report.tables.len(),
                    uploads = report.uploads_restored,
                    "backup restored"
                );
                true
            }
            Err(e) => {
                error!(archive = %archive_path.display(), error = %e, "backup restore failed");
                false
            }
        }
    }

    pub async fn try_restore(&self, archive_path: &Path, request: RestoreRequest) -> Result<RestoreReport, BackupError> {
        if !tokio::fs::try_exists(archive_path).await? {
            return Err(BackupError::NotFound(archive_path.display().to_string()));
        }

        // removed on drop, whichever way this function exits
        let scratch = match &self.scratch_dir {
            Some(dir) => tempfile::Builder::new().prefix(".restore-").tempdir_in(dir)?,
            None => tempfile::tempdir()?,
        };
        let (metadata, dump) = {
            let src = archive_path.to_path_buf();
            let dest = scratch.path().to_path_buf();
            tokio::task::spawn_blocking(move || archive::unpack(&src, &dest)).await??
        };

        let original = metadata.workspace_id;
        let target = request.target_workspace_id.or(original);
        let _guard = self.locks.acquire(target).await;

        let plan = Plan { original, target, tables: request.tables.as_deref() };
        let txn = self.db.begin().await?;
        let (tables, skipped_tables) = match apply_dump(&txn, &self.schema, &dump, &plan).await {
            Ok(applied) => applied,
            Err(e) => {
                if let Err(rollback) = txn.rollback().await {
                    error!(error = %rollback, "rollback after failed restore also failed");
                }
                return Err(e);
            }
        };
        txn.commit().await?;

        let extracted_uploads = scratch.path().join(UPLOADS_DIR);
        let uploads_restored = if request.include_uploads && metadata.include_uploads && extracted_uploads.is_dir() {
            let root = self.paths.uploads_dir.clone();
            match tokio::task::spawn_blocking(move || uploads::restore(&extracted_uploads, &root, original, target)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    warn!(error = %e, "uploads not restored");
                    0
                }
                Err(e) => {
                    warn!(error = %e, "upload restore task failed");
                    0
                }
            }
        } else {
            0
        };

        Ok(RestoreReport {
            backup_id: metadata.backup_id,
            original_workspace_id: original,
            target_workspace_id: target,
            tables,
            skipped_tables,
            uploads_restored,
        })
    }
}

/// Delete then insert, all on `conn`. Deletes run children first, inserts
/// parents first, both following the descriptor order.
async fn apply_dump<C: ConnectionTrait>(
    conn: &C,
    schema: &SchemaDescriptor,
    dump: &TableDump,
    plan: &Plan<'_>,
) -> Result<(Vec<TableReport>, Vec<String>), BackupError> {
    let mut skipped_tables = Vec::new();
    for name in dump.keys() {
        if plan.wants(name) && schema.table(name).is_none() {
            warn!(table = %name, "table in backup no longer exists, skipped");
            skipped_tables.push(name.clone());
        }
    }

    let tables: Vec<&TableDescriptor> = schema
        .tables
        .iter()
        .filter(|t| dump.contains_key(t.name) && plan.wants(t.name))
        .collect();
    let mut reports: Vec<TableReport> = tables
        .iter()
        .map(|t| TableReport { table: t.name.to_string(), ..TableReport::default() })
        .collect();

    for (table, report) in tables.iter().zip(reports.iter_mut()).rev() {
        report.deleted = delete_workspace_rows(conn, table, plan).await?;
    }

    for (table, report) in tables.iter().zip(reports.iter_mut()) {
        let rows = dump.get(table.name).map(Vec::as_slice).unwrap_or_default();
        if table.identity && plan.target.is_some() {
            report.skipped = rows.len() as u64;
            continue;
        }
        insert_rows(conn, table, rows, plan, report).await?;
        if report.inserted > 0 {
            reset_sequence(conn, table).await?;
        }
    }

    Ok((reports, skipped_tables))
}

async fn delete_workspace_rows<C: ConnectionTrait>(
    conn: &C,
    table: &TableDescriptor,
    plan: &Plan<'_>,
) -> Result<u64, BackupError> {
    let (Some(column), Some(target)) = (table.tenant_column(), plan.target) else {
        return Ok(0);
    };
    if table.identity {
        return Ok(0);
    }
    let delete = Query::delete()
        .from_table(Alias::new(table.name))
        .and_where(Expr::col(Alias::new(column)).eq(target))
        .to_owned();
    let result = conn.execute(conn.get_database_backend().build(&delete)).await?;
    Ok(result.rows_affected())
}

async fn insert_rows<C: ConnectionTrait>(
    conn: &C,
    table: &TableDescriptor,
    rows: &[archive::Row],
    plan: &Plan<'_>,
    report: &mut TableReport,
) -> Result<(), BackupError> {
    let backend = conn.get_database_backend();
    let tenant_column = table.tenant_column();
    let mut dropped: BTreeSet<&str> = BTreeSet::new();

    for row in rows {
        if !plan.keeps_root_row(table, row) {
            report.skipped += 1;
            continue;
        }
        let mut columns = Vec::with_capacity(row.len());
        let mut exprs: Vec<SimpleExpr> = Vec::with_capacity(row.len());
        for (key, value) in row {
            let Some(column) = table.column(key) else {
                dropped.insert(key.as_str());
                continue;
            };
            let value = match plan.remaps() {
                Some((from, to)) if tenant_column == Some(column.name) && value.as_i64() == Some(i64::from(from)) => {
                    Json::from(to)
                }
                _ => value.clone(),
            };
            let db_value = values::to_db_value(&value, column.kind).map_err(|reason| BackupError::InvalidValue {
                table: table.name.to_string(),
                column: column.name.to_string(),
                reason,
            })?;
            columns.push(Alias::new(column.name));
            exprs.push(db_value.into());
        }
        if columns.is_empty() {
            report.skipped += 1;
            continue;
        }

        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(table.name))
            .columns(columns)
            .values(exprs)
            .map_err(|e| BackupError::Db(e.to_string()))?;
        if table.insert_if_absent() {
            insert.on_conflict(OnConflict::column(Alias::new(table.primary_key)).do_nothing().to_owned());
        }
        let result = conn.execute(backend.build(&insert)).await?;
        if result.rows_affected() > 0 {
            report.inserted += 1;
        } else {
            report.skipped += 1;
        }
    }

    if !dropped.is_empty() {
        warn!(table = table.name, columns = ?dropped, "columns in backup no longer exist, dropped");
    }
    Ok(())
}

/// Explicit ids do not advance Postgres serial sequences; move them past
/// the highest restored key.
async fn reset_sequence<C: ConnectionTrait>(conn: &C, table: &TableDescriptor) -> Result<(), BackupError> {
    if conn.get_database_backend() != DatabaseBackend::Postgres {
        return Ok(());
    }
    let sql = format!(
        r#"SELECT setval(pg_get_serial_sequence('"{t}"', '{pk}'), COALESCE(MAX("{pk}"), 0) + 1, false) FROM "{t}""#,
        t = table.name,
        pk = table.primary_key,
    );
    conn.execute(Statement::from_string(DatabaseBackend::Postgres, sql)).await?;
    Ok(())
}
