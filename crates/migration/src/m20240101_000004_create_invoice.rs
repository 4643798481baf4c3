//! Create `invoices` table with FKs to `workspaces` and `customers`.
//!
//! Invoice numbers are unique across the installation (`INV-YYYY-NNNN`).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(pk_auto(Invoices::Id))
                    .col(integer(Invoices::WorkspaceId))
                    .col(integer(Invoices::CustomerId))
                    .col(string_len(Invoices::InvoiceNumber, 32).unique_key())
                    .col(date(Invoices::Date))
                    .col(string_len(Invoices::InvoiceType, 16))
                    .col(double(Invoices::AmountInclVat))
                    .col(double(Invoices::AmountExclVat))
                    .col(double(Invoices::VatRate))
                    .col(double(Invoices::VatAmount))
                    .col(date_time(Invoices::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_workspace")
                            .from(Invoices::Table, Invoices::WorkspaceId)
                            .to(Workspaces::Table, Workspaces::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_customer")
                            .from(Invoices::Table, Invoices::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Invoices::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    WorkspaceId,
    CustomerId,
    InvoiceNumber,
    Date,
    InvoiceType,
    AmountInclVat,
    AmountExclVat,
    VatRate,
    VatAmount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Workspaces { Table, Id }

#[derive(DeriveIden)]
enum Customers { Table, Id }
