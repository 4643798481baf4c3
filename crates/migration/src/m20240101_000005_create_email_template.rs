//! Create `email_templates` table with FK to `workspaces`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EmailTemplates::Table)
                    .if_not_exists()
                    .col(pk_auto(EmailTemplates::Id))
                    .col(integer(EmailTemplates::WorkspaceId))
                    .col(string_len(EmailTemplates::Name, 100))
                    .col(string_len(EmailTemplates::Subject, 200))
                    .col(text(EmailTemplates::BodyHtml))
                    .col(string_len(EmailTemplates::TemplateType, 50))
                    .col(boolean(EmailTemplates::IsDefault).default(false))
                    .col(date_time(EmailTemplates::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_email_templates_workspace")
                            .from(EmailTemplates::Table, EmailTemplates::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(EmailTemplates::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum EmailTemplates { Table, Id, WorkspaceId, Name, Subject, BodyHtml, TemplateType, IsDefault, CreatedAt }

#[derive(DeriveIden)]
enum Workspaces { Table, Id }
