//! Create `workspaces` table.
//!
//! Root entity for multi-tenancy; every tenant-owned table references it.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Workspaces::Table)
                    .if_not_exists()
                    .col(pk_auto(Workspaces::Id))
                    .col(string_len(Workspaces::Name, 100).unique_key())
                    .col(string_len_null(Workspaces::Description, 200))
                    .col(date_time(Workspaces::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Workspaces::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Workspaces { Table, Id, Name, Description, CreatedAt }
