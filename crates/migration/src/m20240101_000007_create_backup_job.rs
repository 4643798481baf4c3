//! Create `backup_jobs` table with FK to `backup_settings`.
//!
//! One row per attempted backup; tracks status and the archive it produced.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BackupJobs::Table)
                    .if_not_exists()
                    .col(pk_auto(BackupJobs::Id))
                    .col(integer(BackupJobs::BackupSettingsId))
                    .col(boolean(BackupJobs::Scheduled).default(false))
                    .col(string_len(BackupJobs::BackupType, 20))
                    .col(string_len(BackupJobs::Status, 20))
                    .col(boolean(BackupJobs::IncludeUploads))
                    .col(text_null(BackupJobs::Tables))
                    .col(string_len_null(BackupJobs::BackupId, 16))
                    .col(string_len_null(BackupJobs::Filename, 255))
                    .col(big_integer_null(BackupJobs::FileSize))
                    .col(text_null(BackupJobs::ResultMessage))
                    .col(text_null(BackupJobs::ErrorDetails))
                    .col(date_time_null(BackupJobs::StartTime))
                    .col(date_time_null(BackupJobs::EndTime))
                    .col(date_time(BackupJobs::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_backup_jobs_settings")
                            .from(BackupJobs::Table, BackupJobs::BackupSettingsId)
                            .to(BackupSettings::Table, BackupSettings::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(BackupJobs::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum BackupJobs {
    Table,
    Id,
    BackupSettingsId,
    Scheduled,
    BackupType,
    Status,
    IncludeUploads,
    Tables,
    BackupId,
    Filename,
    FileSize,
    ResultMessage,
    ErrorDetails,
    StartTime,
    EndTime,
    CreatedAt,
}

#[derive(DeriveIden)]
enum BackupSettings { Table, Id }
