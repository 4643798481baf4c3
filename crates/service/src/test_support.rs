#![cfg(test)]
use chrono::NaiveDate;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tempfile::TempDir;
use uuid::Uuid;

use models::{customer, email_template, invoice, user, workspace};

use crate::backup::{BackupPaths, BackupService, SchemaDescriptor};

/// Throwaway SQLite database plus backup/uploads roots under one temp dir.
/// Keep the value alive for the duration of the test.
pub struct TestEnv {
    pub db: DatabaseConnection,
    pub paths: BackupPaths,
    _dir: TempDir,
}

pub async fn get_env() -> Result<TestEnv, anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite://{}/service.db?mode=rwc", dir.path().display());
    let db = Database::connect(url).await?;
    migration::Migrator::up(&db, None).await?;
    let paths = BackupPaths {
        backup_dir: dir.path().join("backups"),
        uploads_dir: dir.path().join("uploads"),
    };
    Ok(TestEnv { db, paths, _dir: dir })
}

impl TestEnv {
    pub fn service(&self) -> BackupService {
        BackupService::new(self.db.clone(), self.paths.clone(), SchemaDescriptor::v1())
    }

    pub fn write_upload(&self, rel: &str, contents: &[u8]) -> std::io::Result<()> {
        let path = self.paths.uploads_dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    pub fn upload_exists(&self, rel: &str) -> bool {
        self.paths.uploads_dir.join(rel).is_file()
    }
}

pub struct Seeded {
    pub workspace: workspace::Model,
    pub customer: customer::Model,
    pub invoice: invoice::Model,
}

/// A workspace with one user, customer, invoice and email template.
pub async fn seed_workspace(db: &DatabaseConnection, name: &str) -> Result<Seeded, anyhow::Error> {
    let ws = workspace::create(db, name, Some("seeded")).await?;
    user::create(db, Some(ws.id), &format!("{name}_admin"), &format!("admin@{name}.test"), "hash").await?;

    let mut am: customer::ActiveModel = customer::create(db, ws.id, &format!("{name} customer"), Some("BE0999"), None).await?.into();
    am.public_id = Set(Some(Uuid::new_v4()));
    am.address = Set(Some("Main street 1".into()));
    let customer = am.update(db).await?;

    let date = NaiveDate::from_ymd_opt(2024, 3, 1).ok_or_else(|| anyhow::anyhow!("date"))?;
    let invoice = invoice::create(db, ws.id, customer.id, &format!("INV-{name}-1"), date, invoice::TYPE_INCOME, 121.0, 21.0).await?;
    email_template::create(db, ws.id, "Reminder", "Payment due", "<p>Please pay</p>", "reminder").await?;

    Ok(Seeded { workspace: ws, customer, invoice })
}
