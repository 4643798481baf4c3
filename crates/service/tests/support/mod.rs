use std::path::PathBuf;

use chrono::NaiveDate;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tempfile::TempDir;
use uuid::Uuid;

use models::{customer, email_template, invoice, user, workspace};
use service::backup::{BackupPaths, BackupService, SchemaDescriptor};

pub struct Env {
    pub db: DatabaseConnection,
    pub service: BackupService,
    pub backup_dir: PathBuf,
    pub uploads_dir: PathBuf,
    _dir: TempDir,
}

pub async fn env() -> anyhow::Result<Env> {
    let dir = tempfile::tempdir()?;
    let db = Database::connect(format!("sqlite://{}/it.db?mode=rwc", dir.path().display())).await?;
    migration::Migrator::up(&db, None).await?;
    let paths = BackupPaths { backup_dir: dir.path().join("backups"), uploads_dir: dir.path().join("uploads") };
    let service = BackupService::new(db.clone(), paths.clone(), SchemaDescriptor::v1());
    Ok(Env { db, service, backup_dir: paths.backup_dir, uploads_dir: paths.uploads_dir, _dir: dir })
}

impl Env {
    pub fn put_upload(&self, rel: &str, contents: &[u8]) -> std::io::Result<()> {
        let path = self.uploads_dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap_or(&self.uploads_dir))?;
        std::fs::write(path, contents)
    }
}

/// Workspace with a user, two customers, three invoices and a template.
pub async fn seed(db: &DatabaseConnection, name: &str) -> anyhow::Result<workspace::Model> {
    let ws = workspace::create(db, name, None).await?;
    user::create(db, Some(ws.id), &format!("{name}_owner"), &format!("owner@{name}.test"), "hash").await?;
    for c in 0..2 {
        let email = format!("c{c}@{name}.test");
        let mut am: customer::ActiveModel =
            customer::create(db, ws.id, &format!("{name} customer {c}"), None, Some(email.as_str())).await?.into();
        am.public_id = Set(Some(Uuid::new_v4()));
        let cust = am.update(db).await?;
        for i in 0..(c + 1) {
            let date = NaiveDate::from_ymd_opt(2024, 1 + i as u32, 15).unwrap_or_default();
            invoice::create(db, ws.id, cust.id, &format!("{name}-{c}-{i}"), date, invoice::TYPE_INCOME, 100.0 + i as f64, 21.0).await?;
        }
    }
    email_template::create(db, ws.id, "Invoice", "Your invoice", "<p>Attached</p>", "invoice").await?;
    Ok(ws)
}
