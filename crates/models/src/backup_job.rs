use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backup_settings;

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_FAILED: &str = "failed";

pub const TYPE_FULL: &str = "full";
pub const TYPE_DATABASE: &str = "database";

/// One attempted backup and the archive it produced, if any.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "backup_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub backup_settings_id: i32,
    pub scheduled: bool,
    pub backup_type: String,
    pub status: String,
    pub include_uploads: bool,
    /// JSON array of table names, or NULL for all tables.
    #[sea_orm(column_type = "Text", nullable)]
    pub tables: Option<String>,
    pub backup_id: Option<String>,
    pub filename: Option<String>,
    pub file_size: Option<i64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub result_message: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_details: Option<String>,
    pub start_time: Option<DateTime>,
    pub end_time: Option<DateTime>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    BackupSettings,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::BackupSettings => Entity::belongs_to(backup_settings::Entity)
                .from(Column::BackupSettingsId)
                .to(backup_settings::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
