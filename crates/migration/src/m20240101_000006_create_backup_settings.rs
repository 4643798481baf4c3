//! Create `backup_settings` table, one row per workspace.
//!
//! Holds the plan and the declared automatic-backup schedule.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BackupSettings::Table)
                    .if_not_exists()
                    .col(pk_auto(BackupSettings::Id))
                    .col(integer(BackupSettings::WorkspaceId).unique_key())
                    .col(string_len(BackupSettings::Plan, 20))
                    .col(boolean(BackupSettings::BackupEnabled).default(true))
                    .col(boolean(BackupSettings::IncludeUploads).default(true))
                    .col(boolean(BackupSettings::AutoBackupEnabled).default(false))
                    .col(string_len(BackupSettings::AutoBackupInterval, 20))
                    .col(string_len(BackupSettings::AutoBackupTime, 5))
                    .col(integer_null(BackupSettings::AutoBackupDay))
                    .col(integer(BackupSettings::RetentionDays))
                    .col(date_time_null(BackupSettings::LastBackupDate))
                    .col(date_time(BackupSettings::CreatedAt))
                    .col(date_time(BackupSettings::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_backup_settings_workspace")
                            .from(BackupSettings::Table, BackupSettings::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(BackupSettings::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum BackupSettings {
    Table,
    Id,
    WorkspaceId,
    Plan,
    BackupEnabled,
    IncludeUploads,
    AutoBackupEnabled,
    AutoBackupInterval,
    AutoBackupTime,
    AutoBackupDay,
    RetentionDays,
    LastBackupDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Workspaces { Table, Id }
