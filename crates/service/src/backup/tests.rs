use std::fs::File;

use chrono::{Duration, Local};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

use models::{customer, invoice, user, workspace};

use super::archive::{self, Row, FORMAT_VERSION};
use super::*;
use crate::test_support::{get_env, seed_workspace};

fn write_crafted(path: &Path, workspace_id: Option<i32>, dump: &TableDump) {
    let metadata = BackupMetadata {
        backup_id: "crafted1".into(),
        timestamp: Local::now().format(archive::TIMESTAMP_FORMAT).to_string(),
        workspace_id,
        include_uploads: false,
        tables: None,
        version: FORMAT_VERSION.into(),
    };
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    archive::write_archive(File::create(path).unwrap(), dump, &metadata, &[]).unwrap();
}

fn row(value: serde_json::Value) -> Row {
    value.as_object().unwrap().clone()
}

#[tokio::test]
async fn dump_is_narrowed_to_one_workspace() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let a = seed_workspace(&env.db, "alpha").await?;
    seed_workspace(&env.db, "beta").await?;

    let dump = writer::dump_tables(&env.db, &SchemaDescriptor::v1(), Some(a.workspace.id), None).await?;
    assert_eq!(dump["workspaces"].len(), 1);
    assert_eq!(dump["workspaces"][0]["id"], json!(a.workspace.id));
    for table in ["users", "customers", "invoices", "email_templates"] {
        assert_eq!(dump[table].len(), 1, "{table}");
        assert_eq!(dump[table][0]["workspace_id"], json!(a.workspace.id));
    }

    let inv = &dump["invoices"][0];
    assert_eq!(inv["date"], json!("2024-03-01"));
    assert_eq!(inv["amount_incl_vat"], json!(121.0));
    let cust = &dump["customers"][0];
    assert_eq!(cust["public_id"], json!(a.customer.public_id.unwrap().to_string()));
    assert_eq!(cust["updated_at"], serde_json::Value::Null);
    assert!(cust["created_at"].as_str().unwrap().contains('T'));
    Ok(())
}

#[tokio::test]
async fn dump_of_everything_keeps_workspaceless_users() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    seed_workspace(&env.db, "alpha").await?;
    user::create(&env.db, None, "root", "root@example.com", "hash").await?;

    let dump = writer::dump_tables(&env.db, &SchemaDescriptor::v1(), None, None).await?;
    assert_eq!(dump["users"].len(), 2);
    assert!(dump["users"].iter().any(|u| u["workspace_id"].is_null()));
    Ok(())
}

#[tokio::test]
async fn create_leaves_only_the_final_archive() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let a = seed_workspace(&env.db, "alpha").await?;
    let service = env.service();

    let info = service.create(BackupRequest::workspace(a.workspace.id)).await?;
    assert!(info.path.is_absolute());
    assert!(info.size > 0);
    assert_eq!(info.filename, format!("backup_workspace_{}_{}_{}.zip", a.workspace.id, info.timestamp, info.backup_id));

    let names: Vec<String> = std::fs::read_dir(&env.paths.backup_dir)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names, vec![info.filename.clone()]);
    Ok(())
}

#[tokio::test]
async fn named_backups_use_the_sanitized_name() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    seed_workspace(&env.db, "alpha").await?;
    let info = env
        .service()
        .create(BackupRequest { name: Some("before year end!".into()), ..BackupRequest::default() })
        .await?;
    assert_eq!(info.filename, format!("before_year_end_{}.zip", info.timestamp));
    assert_eq!(info.workspace_id, None);
    Ok(())
}

#[tokio::test]
async fn archive_path_rejects_traversal() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let service = env.service();
    assert!(service.archive_path("../service.db").is_err());
    assert_eq!(service.archive_path("a.zip")?, env.paths.backup_dir.join("a.zip"));
    Ok(())
}

#[tokio::test]
async fn restore_of_missing_archive_is_false() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let service = env.service();
    let missing = env.paths.backup_dir.join("nope.zip");
    assert!(!service.restore(&missing, RestoreRequest::default()).await);
    assert!(matches!(service.try_restore(&missing, RestoreRequest::default()).await, Err(BackupError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn schema_drift_is_skipped_with_a_warning() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let a = seed_workspace(&env.db, "alpha").await?;
    let ws = a.workspace.id;

    let mut dump = TableDump::new();
    dump.insert("legacy_notes".into(), vec![row(json!({"id": 1, "text": "old"}))]);
    dump.insert(
        "customers".into(),
        vec![row(json!({
            "id": 500, "workspace_id": ws, "name": "From backup", "fax": "+32 1234",
            "created_at": "2023-05-06T07:08:09", "address": null
        }))],
    );
    let path = env.paths.backup_dir.join("crafted.zip");
    write_crafted(&path, Some(ws), &dump);

    let report = env.service().try_restore(&path, RestoreRequest::default()).await?;
    assert_eq!(report.skipped_tables, vec!["legacy_notes".to_string()]);
    assert_eq!(report.tables.len(), 1);
    assert_eq!(report.tables[0].table, "customers");
    assert_eq!(report.tables[0].deleted, 1);
    assert_eq!(report.tables[0].inserted, 1);

    let restored = customer::Entity::find_by_id(500).one(&env.db).await?.unwrap();
    assert_eq!(restored.name, "From backup");
    assert_eq!(restored.vat_number, None);
    assert!(customer::Entity::find_by_id(a.customer.id).one(&env.db).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn unparsable_value_rolls_back() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let a = seed_workspace(&env.db, "alpha").await?;
    let ws = a.workspace.id;

    let mut dump = TableDump::new();
    dump.insert(
        "customers".into(),
        vec![row(json!({"id": 600, "workspace_id": ws, "name": "Temp", "created_at": "2023-05-06T07:08:09"}))],
    );
    dump.insert(
        "invoices".into(),
        vec![row(json!({
            "id": 600, "workspace_id": ws, "customer_id": 600, "invoice_number": "X-1",
            "date": "first of may", "invoice_type": "income", "amount_incl_vat": 1.0,
            "amount_excl_vat": 1.0, "vat_rate": 0.0, "vat_amount": 0.0, "created_at": "2023-05-06T07:08:09"
        }))],
    );
    let path = env.paths.backup_dir.join("broken.zip");
    write_crafted(&path, Some(ws), &dump);

    let scratch = tempfile::tempdir()?;
    let restorer = Restorer::new(env.db.clone(), env.paths.clone(), Arc::new(SchemaDescriptor::v1()), Arc::new(ScopeLocks::new()))
        .with_scratch_dir(scratch.path().to_path_buf());
    let err = restorer.try_restore(&path, RestoreRequest::default()).await.unwrap_err();
    assert!(matches!(err, BackupError::InvalidValue { ref column, .. } if column == "date"));
    // extraction directory is gone again
    assert_eq!(std::fs::read_dir(scratch.path())?.count(), 0);

    assert!(customer::Entity::find_by_id(600).one(&env.db).await?.is_none());
    assert!(customer::Entity::find_by_id(a.customer.id).one(&env.db).await?.is_some());
    assert!(invoice::Entity::find_by_id(a.invoice.id).one(&env.db).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn uploads_follow_both_restore_and_archive_flags() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let a = seed_workspace(&env.db, "alpha").await?;
    let ws = a.workspace.id;
    let logo = format!("{ws}/logo.png");
    env.write_upload(&logo, b"png")?;
    let service = env.service();
    let with_uploads = service.create(BackupRequest::workspace(ws)).await?;
    let without_uploads = service
        .create(BackupRequest { include_uploads: false, name: Some("db only".into()), ..BackupRequest::workspace(ws) })
        .await?;
    std::fs::remove_file(env.paths.uploads_dir.join(&logo))?;

    let skipped = RestoreRequest { include_uploads: false, ..RestoreRequest::default() };
    let report = service.try_restore(&with_uploads.path, skipped).await?;
    assert_eq!(report.uploads_restored, 0);
    assert!(!env.upload_exists(&logo));

    let report = service.try_restore(&without_uploads.path, RestoreRequest::default()).await?;
    assert_eq!(report.uploads_restored, 0);
    assert!(!env.upload_exists(&logo));

    let report = service.try_restore(&with_uploads.path, RestoreRequest::default()).await?;
    assert_eq!(report.uploads_restored, 1);
    assert!(env.upload_exists(&logo));
    Ok(())
}

#[tokio::test]
async fn identity_rows_are_left_alone_for_a_target_workspace() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let a = seed_workspace(&env.db, "alpha").await?;
    let service = env.service();
    let info = service.create(BackupRequest::workspace(a.workspace.id)).await?;

    user::create(&env.db, Some(a.workspace.id), "late", "late@alpha.test", "hash").await?;

    let report = service.try_restore(&info.path, RestoreRequest::default()).await?;
    let users = report.tables.iter().find(|t| t.table == "users").unwrap();
    assert_eq!((users.deleted, users.inserted, users.skipped), (0, 0, 1));
    let workspaces = report.tables.iter().find(|t| t.table == "workspaces").unwrap();
    assert_eq!((workspaces.inserted, workspaces.skipped), (0, 1));
    assert_eq!(user::Entity::find().filter(user::Column::WorkspaceId.eq(a.workspace.id)).count(&env.db).await?, 2);
    Ok(())
}

#[tokio::test]
async fn full_backup_restores_into_an_empty_database() -> Result<(), anyhow::Error> {
    let source = get_env().await?;
    seed_workspace(&source.db, "alpha").await?;
    seed_workspace(&source.db, "beta").await?;
    user::create(&source.db, None, "root", "root@example.com", "hash").await?;
    let info = source.service().create(BackupRequest::default()).await?;

    let target = get_env().await?;
    let report = target.service().try_restore(&info.path, RestoreRequest::default()).await?;
    assert_eq!(report.target_workspace_id, None);

    assert_eq!(workspace::Entity::find().count(&target.db).await?, 2);
    assert_eq!(user::Entity::find().count(&target.db).await?, 3);
    assert_eq!(invoice::Entity::find().all(&target.db).await?, invoice::Entity::find().all(&source.db).await?);
    assert_eq!(customer::Entity::find().all(&target.db).await?, customer::Entity::find().all(&source.db).await?);

    // ids continue after the restored ones
    let next = models::workspace::create(&target.db, "gamma", None).await?;
    assert_eq!(next.id, 3);
    Ok(())
}

#[tokio::test]
async fn scheduler_prunes_only_its_own_scope() -> Result<(), anyhow::Error> {
    let env = get_env().await?;
    let a = seed_workspace(&env.db, "alpha").await?;
    let service = env.service();
    let other = service.create(BackupRequest::default()).await?;

    let config = configs::ScheduleConfig {
        enabled: true,
        workspace_id: Some(a.workspace.id),
        include_uploads: false,
        retention_days: 30,
        ..configs::ScheduleConfig::default()
    };
    let scheduler = BackupScheduler::new(service.clone(), config)?;

    let now = Local::now().naive_local();
    let run = scheduler.run_once(now).await?;
    assert_eq!(run.backup.workspace_id, Some(a.workspace.id));
    assert!(run.pruned.is_empty());

    let pruned = scheduler.prune_expired(now + Duration::days(31)).await?;
    assert_eq!(pruned, vec![run.backup.filename.clone()]);
    let left: Vec<_> = service.list(None).await?.into_iter().map(|b| b.filename).collect();
    assert_eq!(left, vec![other.filename]);
    Ok(())
}
