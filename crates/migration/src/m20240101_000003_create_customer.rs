//! Create `customers` table with FK to `workspaces`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(pk_auto(Customers::Id))
                    .col(integer(Customers::WorkspaceId))
                    .col(string_len(Customers::Name, 200))
                    .col(text_null(Customers::Address))
                    .col(string_len_null(Customers::VatNumber, 32))
                    .col(string_len_null(Customers::Email, 120))
                    .col(uuid_null(Customers::PublicId))
                    .col(date_time(Customers::CreatedAt))
                    .col(date_time_null(Customers::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_workspace")
                            .from(Customers::Table, Customers::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Customers::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Customers { Table, Id, WorkspaceId, Name, Address, VatNumber, Email, PublicId, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Workspaces { Table, Id }
