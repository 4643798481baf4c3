use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

use migration::MigratorTrait;
use service::backup::{BackupPaths, BackupRequest, BackupScheduler, BackupService, RestoreRequest, SchemaDescriptor};
use service::{backup_job_service, backup_settings_service};

/// Workspace backup and restore for the invoicing database.
#[derive(Debug, Parser)]
#[command(name = "backupd", version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a new archive to the backup directory
    Create {
        /// Only this workspace; all workspaces when omitted
        #[arg(long)]
        workspace: Option<i32>,
        #[arg(long)]
        no_uploads: bool,
        /// Restrict to a table (repeatable)
        #[arg(long = "table")]
        tables: Vec<String>,
        #[arg(long)]
        name: Option<String>,
        /// Apply plan limits and record a backup job (needs --workspace)
        #[arg(long, requires = "workspace")]
        tracked: bool,
    },
    /// List archives, newest first
    List {
        #[arg(long)]
        workspace: Option<i32>,
    },
    /// Restore an archive (file name in the backup directory, or a path)
    Restore {
        file: String,
        /// Target workspace; defaults to the one recorded in the archive
        #[arg(long)]
        workspace: Option<i32>,
        #[arg(long)]
        no_uploads: bool,
        #[arg(long = "table")]
        tables: Vec<String>,
    },
    /// Delete an archive and any job that references it
    Delete { file: String },
    /// Show the latest backup jobs of a workspace
    Jobs {
        #[arg(long)]
        workspace: i32,
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Run the backup scheduler until Ctrl+C
    Run,
}

fn init_logging(json: bool) {
    dotenv().ok();
    if json {
        common::utils::logging::init_logging_json();
    } else {
        common::utils::logging::init_logging_default();
    }
    info!(service = "backupd", event = "logger_init", "tracing subscriber initialized");
}

fn non_empty(tables: Vec<String>) -> Option<Vec<String>> {
    if tables.is_empty() { None } else { Some(tables) }
}

fn resolve_archive(service: &BackupService, file: &str) -> PathBuf {
    match service.archive_path(file) {
        Ok(path) if path.exists() => path,
        _ => PathBuf::from(file),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(command: Command) -> anyhow::Result<ExitCode> {
    let cfg = configs::AppConfig::load_and_validate()?;
    let db = models::db::connect_with_config(&cfg.database).await?;
    migration::Migrator::up(&db, None).await?;
    common::env::ensure_env(&cfg.backup.backup_dir, &cfg.backup.uploads_dir).await?;

    let backups = BackupService::new(db.clone(), BackupPaths::from_config(&cfg.backup), SchemaDescriptor::v1());

    match command {
        Command::Create { workspace, no_uploads, tables, name, tracked } => {
            let request = BackupRequest { workspace_id: workspace, include_uploads: !no_uploads, tables: non_empty(tables), name };
            match workspace.filter(|_| tracked) {
                Some(id) => {
                    backup_settings_service::get_or_create_settings(&db, id).await?;
                    let (job, info) = backup_job_service::run_tracked_backup(&db, &backups, id, request, false).await?;
                    info!(job_id = job.id, "backup job recorded");
                    print_json(&info)?;
                }
                None => print_json(&backups.create(request).await?)?,
            }
        }
        Command::List { workspace } => print_json(&backups.list(workspace).await?)?,
        Command::Restore { file, workspace, no_uploads, tables } => {
            let path = resolve_archive(&backups, &file);
            let request = RestoreRequest { target_workspace_id: workspace, include_uploads: !no_uploads, tables: non_empty(tables) };
            match backups.try_restore(&path, request).await {
                Ok(report) => print_json(&report)?,
                Err(e) => {
                    error!(archive = %path.display(), error = %e, "restore failed");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::Delete { file } => {
            let is_bare_name = backups.archive_path(&file).is_ok();
            if is_bare_name {
                backup_job_service::delete_tracked_backup(&db, &backups, &file).await?;
            } else if !backups.delete(&PathBuf::from(&file)).await {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Jobs { workspace, limit } => {
            let settings = backup_settings_service::get_or_create_settings(&db, workspace).await?;
            print_json(&backup_job_service::recent_jobs(&db, settings.id, limit).await?)?;
        }
        Command::Run => {
            if !cfg.backup.schedule.enabled {
                anyhow::bail!("backup.schedule.enabled is false; nothing to run");
            }
            let scheduler = BackupScheduler::new(backups, cfg.backup.schedule.clone())?;
            scheduler
                .run(async {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!(service = "backupd", event = "shutdown_signal", "received Ctrl+C, shutting down");
                    }
                })
                .await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let run_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "backupd", event = "panic", %run_id, pid, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "backupd", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(service = "backupd", event = "start", %run_id, pid, version, command = ?cli.command, "backupd starting");

    rt.block_on(async move {
        match run(cli.command).await {
            Ok(code) => code,
            Err(e) => {
                error!(service = "backupd", event = "run_failed", error = %e, "backupd failed");
                ExitCode::FAILURE
            }
        }
    })
}
