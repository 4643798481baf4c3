use chrono::{NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use configs::ScheduleInterval;
use models::backup_settings::{self, BackupPlan};
use models::WorkspaceId;

use crate::backup::schedule;
use crate::errors::ServiceError;

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub plan: Option<BackupPlan>,
    pub backup_enabled: Option<bool>,
    pub include_uploads: Option<bool>,
    pub auto_backup_enabled: Option<bool>,
    pub auto_backup_interval: Option<ScheduleInterval>,
    pub auto_backup_time: Option<String>,
    pub auto_backup_day: Option<Option<i32>>,
    pub retention_days: Option<i32>,
}

/// Get the settings of a workspace.
pub async fn get_settings(db: &DatabaseConnection, workspace_id: WorkspaceId) -> Result<Option<backup_settings::Model>, ServiceError> {
    backup_settings::Entity::find()
        .filter(backup_settings::Column::WorkspaceId.eq(workspace_id))
        .one(db)
        .await
        .map_err(|e| ServiceError::Db(e.to_string()))
}

/// Get the settings of a workspace, inserting the free-plan defaults first
/// when none exist.
pub async fn get_or_create_settings(db: &DatabaseConnection, workspace_id: WorkspaceId) -> Result<backup_settings::Model, ServiceError> {
    if let Some(existing) = get_settings(db, workspace_id).await? {
        return Ok(existing);
    }
    Ok(backup_settings::create_default(db, workspace_id).await?)
}

/// Apply `update`. A plan change resets retention to the plan's value and
/// switches off what the new plan does not allow.
pub async fn update_settings(
    db: &DatabaseConnection,
    workspace_id: WorkspaceId,
    update: SettingsUpdate,
) -> Result<backup_settings::Model, ServiceError> {
    let current = get_settings(db, workspace_id).await?.ok_or_else(|| ServiceError::not_found("backup settings"))?;
    let plan = update.plan.unwrap_or_else(|| current.plan());
    let limits = plan.limits();

    let mut am: backup_settings::ActiveModel = current.clone().into();
    if let Some(p) = update.plan {
        am.plan = Set(p.to_string());
        am.retention_days = Set(limits.retention_days as i32);
        if !limits.auto_backup {
            am.auto_backup_enabled = Set(false);
        }
        if !limits.include_uploads {
            am.include_uploads = Set(false);
        }
    }
    if let Some(enabled) = update.backup_enabled {
        am.backup_enabled = Set(enabled);
    }
    if let Some(include) = update.include_uploads {
        if include && !limits.include_uploads {
            return Err(ServiceError::LimitReached(format!("the {plan} plan does not include uploads")));
        }
        am.include_uploads = Set(include);
    }
    if let Some(enabled) = update.auto_backup_enabled {
        if enabled && !limits.auto_backup {
            return Err(ServiceError::LimitReached(format!("the {plan} plan has no automatic backups")));
        }
        am.auto_backup_enabled = Set(enabled);
    }
    if let Some(interval) = update.auto_backup_interval {
        am.auto_backup_interval = Set(interval.as_str().to_string());
    }
    if let Some(time) = update.auto_backup_time {
        configs::parse_time_of_day(&time).map_err(|e| ServiceError::Validation(e.to_string()))?;
        am.auto_backup_time = Set(time);
    }
    if let Some(day) = update.auto_backup_day {
        am.auto_backup_day = Set(day);
    }
    if let Some(days) = update.retention_days {
        if days < 1 || days as u32 > limits.retention_days {
            return Err(ServiceError::Validation(format!(
                "retention_days must be between 1 and {} on the {plan} plan",
                limits.retention_days
            )));
        }
        am.retention_days = Set(days);
    }
    am.updated_at = Set(Utc::now().naive_utc());
    am.update(db).await.map_err(|e| ServiceError::Db(e.to_string()))
}

/// Next automatic backup after `now`, or `None` when automatic backups are off.
pub fn next_auto_backup(settings: &backup_settings::Model, now: NaiveDateTime) -> Result<Option<NaiveDateTime>, ServiceError> {
    if !settings.auto_backup_enabled || !settings.backup_enabled {
        return Ok(None);
    }
    let interval: ScheduleInterval = settings
        .auto_backup_interval
        .parse()
        .map_err(|e: anyhow::Error| ServiceError::Validation(e.to_string()))?;
    let time = configs::parse_time_of_day(&settings.auto_backup_time).map_err(|e| ServiceError::Validation(e.to_string()))?;
    let day = settings.auto_backup_day.and_then(|d| u32::try_from(d).ok());
    Ok(schedule::next_run(now, interval, time, day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_env;
    use chrono::NaiveDate;
    use models::workspace;

    #[tokio::test]
    async fn defaults_then_plan_upgrade() -> Result<(), anyhow::Error> {
        let env = get_env().await?;
        let ws = workspace::create(&env.db, "settings", None).await?;

        let s = get_or_create_settings(&env.db, ws.id).await?;
        assert_eq!(s.plan(), BackupPlan::Free);
        assert!(s.backup_enabled && s.include_uploads && !s.auto_backup_enabled);
        assert_eq!((s.auto_backup_interval.as_str(), s.auto_backup_time.as_str(), s.retention_days), ("daily", "02:00", 7));
        assert_eq!(get_or_create_settings(&env.db, ws.id).await?.id, s.id);

        let denied = update_settings(&env.db, ws.id, SettingsUpdate { auto_backup_enabled: Some(true), ..Default::default() }).await;
        assert!(matches!(denied, Err(ServiceError::LimitReached(_))));

        let upgraded = update_settings(
            &env.db,
            ws.id,
            SettingsUpdate {
                plan: Some(BackupPlan::Premium),
                auto_backup_enabled: Some(true),
                auto_backup_interval: Some(ScheduleInterval::Weekly),
                auto_backup_day: Some(Some(0)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(upgraded.plan(), BackupPlan::Premium);
        assert_eq!(upgraded.retention_days, 30);
        assert!(upgraded.auto_backup_enabled);

        // 2024-03-15 is a Friday; next Monday 02:00
        let now = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let next = next_auto_backup(&upgraded, now)?.unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2024, 3, 18).unwrap().and_hms_opt(2, 0, 0).unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn rejects_invalid_updates() -> Result<(), anyhow::Error> {
        let env = get_env().await?;
        let ws = workspace::create(&env.db, "invalid", None).await?;
        get_or_create_settings(&env.db, ws.id).await?;

        let bad_time = update_settings(&env.db, ws.id, SettingsUpdate { auto_backup_time: Some("7pm".into()), ..Default::default() }).await;
        assert!(matches!(bad_time, Err(ServiceError::Validation(_))));
        let too_long = update_settings(&env.db, ws.id, SettingsUpdate { retention_days: Some(8), ..Default::default() }).await;
        assert!(matches!(too_long, Err(ServiceError::Validation(_))));

        let missing = update_settings(&env.db, ws.id + 100, SettingsUpdate::default()).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
