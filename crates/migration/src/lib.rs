//! Migrator registering the invoicing tables in foreign-key order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_workspace;
mod m20240101_000002_create_user;
mod m20240101_000003_create_customer;
mod m20240101_000004_create_invoice;
mod m20240101_000005_create_email_template;
mod m20240101_000006_create_backup_settings;
mod m20240101_000007_create_backup_job;
mod m20240101_000010_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_workspace::Migration),
            Box::new(m20240101_000002_create_user::Migration),
            Box::new(m20240101_000003_create_customer::Migration),
            Box::new(m20240101_000004_create_invoice::Migration),
            Box::new(m20240101_000005_create_email_template::Migration),
            Box::new(m20240101_000006_create_backup_settings::Migration),
            Box::new(m20240101_000007_create_backup_job::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000010_add_indexes::Migration),
        ]
    }
}
