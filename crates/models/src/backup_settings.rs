use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::{entity::prelude::*, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::workspace;

/// Per-workspace backup configuration. The `auto_backup_*` columns describe
/// the intended schedule; the scheduler in the service crate reads its own
/// config section.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "backup_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub workspace_id: i32,
    pub plan: String,
    pub backup_enabled: bool,
    pub include_uploads: bool,
    pub auto_backup_enabled: bool,
    pub auto_backup_interval: String,
    pub auto_backup_time: String,
    pub auto_backup_day: Option<i32>,
    pub retention_days: i32,
    pub last_backup_date: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Workspace,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self { Relation::Workspace => Entity::belongs_to(workspace::Entity).from(Column::WorkspaceId).to(workspace::Column::Id).into() }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Unknown plan names fall back to the free tier.
    pub fn plan(&self) -> BackupPlan {
        self.plan.parse().unwrap_or(BackupPlan::Free)
    }

    pub fn plan_limits(&self) -> PlanLimits {
        self.plan().limits()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupPlan {
    Free,
    Basic,
    Premium,
    Enterprise,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub max_backups: u32,
    pub auto_backup: bool,
    pub retention_days: u32,
    pub include_uploads: bool,
}

impl BackupPlan {
    pub fn limits(self) -> PlanLimits {
        match self {
            BackupPlan::Free => PlanLimits { max_backups: 2, auto_backup: false, retention_days: 7, include_uploads: false },
            BackupPlan::Basic => PlanLimits { max_backups: 5, auto_backup: true, retention_days: 14, include_uploads: true },
            BackupPlan::Premium => PlanLimits { max_backups: 10, auto_backup: true, retention_days: 30, include_uploads: true },
            BackupPlan::Enterprise => PlanLimits { max_backups: 30, auto_backup: true, retention_days: 90, include_uploads: true },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackupPlan::Free => "free",
            BackupPlan::Basic => "basic",
            BackupPlan::Premium => "premium",
            BackupPlan::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for BackupPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupPlan {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(BackupPlan::Free),
            "basic" => Ok(BackupPlan::Basic),
            "premium" => Ok(BackupPlan::Premium),
            "enterprise" => Ok(BackupPlan::Enterprise),
            other => Err(errors::ModelError::Validation(format!("unknown backup plan `{other}`"))),
        }
    }
}

/// Insert the default settings row for a workspace: free plan, manual backups
/// only, daily at 02:00, seven days of retention.
pub async fn create_default(db: &DatabaseConnection, workspace_id: i32) -> Result<Model, errors::ModelError> {
    let now = Utc::now().naive_utc();
    let am = ActiveModel {
        workspace_id: Set(workspace_id),
        plan: Set(BackupPlan::Free.to_string()),
        backup_enabled: Set(true),
        include_uploads: Set(true),
        auto_backup_enabled: Set(false),
        auto_backup_interval: Set("daily".into()),
        auto_backup_time: Set("02:00".into()),
        auto_backup_day: Set(None),
        retention_days: Set(7),
        last_backup_date: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    am.insert(db).await.map_err(|e| errors::ModelError::Db(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_limits_table() {
        assert_eq!(BackupPlan::Free.limits().max_backups, 2);
        assert!(!BackupPlan::Free.limits().include_uploads);
        assert!(!BackupPlan::Free.limits().auto_backup);
        assert_eq!(BackupPlan::Basic.limits().retention_days, 14);
        assert_eq!(BackupPlan::Premium.limits().max_backups, 10);
        assert_eq!(BackupPlan::Enterprise.limits().retention_days, 90);
    }

    #[test]
    fn plan_parses_and_displays() {
        for plan in [BackupPlan::Free, BackupPlan::Basic, BackupPlan::Premium, BackupPlan::Enterprise] {
            assert_eq!(plan.to_string().parse::<BackupPlan>().unwrap(), plan);
        }
        assert!("gold".parse::<BackupPlan>().is_err());
    }
}
