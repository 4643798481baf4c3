//! Create `users` table with FK to `workspaces`.
//!
//! Super admins carry no workspace, so `workspace_id` stays nullable.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(integer_null(Users::WorkspaceId))
                    .col(string_len(Users::Username, 64))
                    .col(string_len(Users::Email, 120))
                    .col(string_len(Users::PasswordHash, 256))
                    .col(boolean(Users::IsAdmin).default(false))
                    .col(boolean(Users::IsSuperAdmin).default(false))
                    .col(date_time(Users::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_workspace")
                            .from(Users::Table, Users::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Users { Table, Id, WorkspaceId, Username, Email, PasswordHash, IsAdmin, IsSuperAdmin, CreatedAt }

#[derive(DeriveIden)]
enum Workspaces { Table, Id }
