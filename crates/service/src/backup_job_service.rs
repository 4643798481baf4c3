use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tracing::{error, info};

use models::{backup_job, backup_settings, WorkspaceId};

use crate::backup::{BackupError, BackupInfo, BackupRequest, BackupService};
use crate::backup_settings_service::get_settings;
use crate::errors::ServiceError;

/// Create a backup for a workspace under its plan limits and record it as a
/// job. The job ends `completed` or `failed`; a failure is also returned.
pub async fn run_tracked_backup(
    db: &DatabaseConnection,
    backups: &BackupService,
    workspace_id: WorkspaceId,
    mut request: BackupRequest,
    scheduled: bool,
) -> Result<(backup_job::Model, BackupInfo), ServiceError> {
    let settings = get_settings(db, workspace_id).await?.ok_or_else(|| ServiceError::not_found("backup settings"))?;
    if !settings.backup_enabled {
        return Err(ServiceError::Validation("backups are disabled for this workspace".into()));
    }
    let limits = settings.plan_limits();
    let completed = backup_job::Entity::find()
        .filter(backup_job::Column::BackupSettingsId.eq(settings.id))
        .filter(backup_job::Column::Status.eq(backup_job::STATUS_COMPLETED))
        .count(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    if completed >= u64::from(limits.max_backups) {
        return Err(ServiceError::LimitReached(format!(
            "maximum of {} backups reached for the {} plan; delete an old backup or upgrade",
            limits.max_backups,
            settings.plan()
        )));
    }

    request.workspace_id = Some(workspace_id);
    if !limits.include_uploads {
        request.include_uploads = false;
    }

    let now = Utc::now().naive_utc();
    let tables = request
        .tables
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| ServiceError::Validation(e.to_string()))?;
    let job = backup_job::ActiveModel {
        backup_settings_id: Set(settings.id),
        scheduled: Set(scheduled),
        backup_type: Set(if request.include_uploads { backup_job::TYPE_FULL } else { backup_job::TYPE_DATABASE }.to_string()),
        status: Set(backup_job::STATUS_RUNNING.to_string()),
        include_uploads: Set(request.include_uploads),
        tables: Set(tables),
        start_time: Set(Some(now)),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| ServiceError::Db(e.to_string()))?;

    let mut finished: backup_job::ActiveModel = job.into();
    let outcome = backups.create(request).await;
    finished.end_time = Set(Some(Utc::now().naive_utc()));
    match outcome {
        Ok(info) => {
            finished.status = Set(backup_job::STATUS_COMPLETED.to_string());
            finished.backup_id = Set(Some(info.backup_id.clone()));
            finished.filename = Set(Some(info.filename.clone()));
            finished.file_size = Set(i64::try_from(info.size).ok());
            finished.result_message = Set(Some("backup completed".into()));
            let job = finished.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

            let mut s: backup_settings::ActiveModel = settings.into();
            s.last_backup_date = Set(job.end_time);
            s.updated_at = Set(Utc::now().naive_utc());
            s.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;

            info!(workspace_id, job_id = job.id, file = %info.filename, "tracked backup completed");
            Ok((job, info))
        }
        Err(e) => {
            error!(workspace_id, error = %e, "tracked backup failed");
            finished.status = Set(backup_job::STATUS_FAILED.to_string());
            finished.error_details = Set(Some(e.to_string()));
            finished.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))?;
            Err(e.into())
        }
    }
}

/// Drop the job records that point at `filename`, then delete the archive.
pub async fn delete_tracked_backup(db: &DatabaseConnection, backups: &BackupService, filename: &str) -> Result<(), ServiceError> {
    let path = backups.archive_path(filename)?;
    if !tokio::fs::try_exists(&path).await.map_err(BackupError::from)? {
        return Err(ServiceError::not_found("backup file"));
    }
    backup_job::Entity::delete_many()
        .filter(backup_job::Column::Filename.eq(filename))
        .exec(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))?;
    backups.try_delete(&path).await?;
    Ok(())
}

/// Latest jobs of a settings row, newest first.
pub async fn recent_jobs(db: &DatabaseConnection, backup_settings_id: i32, limit: u64) -> Result<Vec<backup_job::Model>, ServiceError> {
    backup_job::Entity::find()
        .filter(backup_job::Column::BackupSettingsId.eq(backup_settings_id))
        .order_by_desc(backup_job::Column::CreatedAt)
        .order_by_desc(backup_job::Column::Id)
        .limit(limit)
        .all(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}
