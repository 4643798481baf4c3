use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users: username and email unique per workspace
        manager
            .create_index(
                Index::create()
                    .name("uix_user_username_workspace")
                    .table(Users::Table)
                    .col(Users::Username)
                    .col(Users::WorkspaceId)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("uix_user_email_workspace")
                    .table(Users::Table)
                    .col(Users::Email)
                    .col(Users::WorkspaceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Tenant lookups done by every backup and restore
        manager
            .create_index(
                Index::create()
                    .name("idx_customers_workspace")
                    .table(Customers::Table)
                    .col(Customers::WorkspaceId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_workspace")
                    .table(Invoices::Table)
                    .col(Invoices::WorkspaceId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_email_templates_workspace")
                    .table(EmailTemplates::Table)
                    .col(EmailTemplates::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        // BackupJobs: listing recent jobs per settings row, lookup by archive name
        manager
            .create_index(
                Index::create()
                    .name("idx_backup_jobs_settings_created")
                    .table(BackupJobs::Table)
                    .col(BackupJobs::BackupSettingsId)
                    .col(BackupJobs::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_backup_jobs_filename")
                    .table(BackupJobs::Table)
                    .col(BackupJobs::Filename)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_backup_jobs_filename",
            "idx_backup_jobs_settings_created",
            "idx_email_templates_workspace",
            "idx_invoices_workspace",
            "idx_customers_workspace",
            "uix_user_email_workspace",
            "uix_user_username_workspace",
        ] {
            manager.drop_index(Index::drop().name(name).to_owned()).await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users { Table, Username, Email, WorkspaceId }

#[derive(DeriveIden)]
enum Customers { Table, WorkspaceId }

#[derive(DeriveIden)]
enum Invoices { Table, WorkspaceId }

#[derive(DeriveIden)]
enum EmailTemplates { Table, WorkspaceId }

#[derive(DeriveIden)]
enum BackupJobs { Table, BackupSettingsId, CreatedAt, Filename }
