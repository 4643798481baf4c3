use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Where archives live and where tenant uploads are read from / restored to.
#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_backup_dir() -> PathBuf { PathBuf::from("backups") }
fn default_uploads_dir() -> PathBuf { PathBuf::from("static/uploads") }

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            uploads_dir: default_uploads_dir(),
            schedule: ScheduleConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleInterval {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl ScheduleInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleInterval::Hourly => "hourly",
            ScheduleInterval::Daily => "daily",
            ScheduleInterval::Weekly => "weekly",
            ScheduleInterval::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for ScheduleInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hourly" => Ok(ScheduleInterval::Hourly),
            "daily" => Ok(ScheduleInterval::Daily),
            "weekly" => Ok(ScheduleInterval::Weekly),
            "monthly" => Ok(ScheduleInterval::Monthly),
            other => Err(anyhow!("unknown backup interval `{other}`")),
        }
    }
}

/// Automatic backup schedule. Disabled unless `enabled = true`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval")]
    pub interval: ScheduleInterval,
    /// Local time of day, `HH:MM`. Minutes past the hour for `hourly`.
    #[serde(default = "default_time")]
    pub time: String,
    /// Weekday for `weekly` (0 = Monday), day of month for `monthly` (1..=28).
    #[serde(default)]
    pub day: Option<u32>,
    /// Workspace to back up; absent means all workspaces.
    #[serde(default)]
    pub workspace_id: Option<i32>,
    #[serde(default = "default_true")]
    pub include_uploads: bool,
    #[serde(default)]
    pub tables: Option<Vec<String>>,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_interval() -> ScheduleInterval { ScheduleInterval::Daily }
fn default_time() -> String { "02:00".to_string() }
fn default_true() -> bool { true }
fn default_retention_days() -> u32 { 30 }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_interval(),
            time: default_time(),
            day: None,
            workspace_id: None,
            include_uploads: true,
            tables: None,
            retention_days: default_retention_days(),
        }
    }
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults plus
    /// environment variables when no file exists, then validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_missing_file(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.database.normalize_from_env();
        self.database.validate()?;
        self.backup.normalize_from_env();
        self.backup.validate()?;
        Ok(())
    }
}

fn is_missing_file(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        // TOML may leave the URL out; DATABASE_URL fills it in
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!("database.url is empty; set it in config.toml or DATABASE_URL"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://") || lower.starts_with("sqlite:")) {
            return Err(anyhow!("database.url must start with postgres://, postgresql:// or sqlite:"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl BackupConfig {
    /// `BACKUP_DIR` and `UPLOADS_DIR` take precedence over the file.
    pub fn normalize_from_env(&mut self) {
        if let Ok(dir) = std::env::var("BACKUP_DIR") {
            if !dir.trim().is_empty() {
                self.backup_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("UPLOADS_DIR") {
            if !dir.trim().is_empty() {
                self.uploads_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backup_dir.as_os_str().is_empty() {
            return Err(anyhow!("backup.backup_dir must not be empty"));
        }
        self.schedule.validate()
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<()> {
        parse_time_of_day(&self.time)?;
        if self.retention_days == 0 {
            return Err(anyhow!("backup.schedule.retention_days must be >= 1"));
        }
        match (self.interval, self.day) {
            (ScheduleInterval::Weekly, Some(d)) if d > 6 => {
                Err(anyhow!("backup.schedule.day must be 0..=6 (Monday = 0) for weekly schedules"))
            }
            (ScheduleInterval::Monthly, Some(d)) if !(1..=28).contains(&d) => {
                Err(anyhow!("backup.schedule.day must be 1..=28 for monthly schedules"))
            }
            _ => Ok(()),
        }
    }

    pub fn time_of_day(&self) -> Result<(u32, u32)> {
        parse_time_of_day(&self.time)
    }
}

/// Parse `HH:MM` into `(hour, minute)`.
pub fn parse_time_of_day(s: &str) -> Result<(u32, u32)> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow!("time `{s}` must look like HH:MM"))?;
    let hour: u32 = h.parse().map_err(|_| anyhow!("invalid hour in `{s}`"))?;
    let minute: u32 = m.parse().map_err(|_| anyhow!("invalid minute in `{s}`"))?;
    if hour > 23 || minute > 59 {
        return Err(anyhow!("time `{s}` out of range"));
    }
    Ok((hour, minute))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            url = "sqlite://data/app.db?mode=rwc"
            max_connections = 4
            min_connections = 1

            [backup]
            backup_dir = "/var/backups/invoicer"

            [backup.schedule]
            enabled = true
            interval = "weekly"
            time = "03:30"
            day = 6
            workspace_id = 5
            retention_days = 14
            "#,
        )
        .unwrap();
        assert_eq!(cfg.backup.backup_dir, PathBuf::from("/var/backups/invoicer"));
        assert_eq!(cfg.backup.uploads_dir, PathBuf::from("static/uploads"));
        assert_eq!(cfg.backup.schedule.interval, ScheduleInterval::Weekly);
        assert_eq!(cfg.backup.schedule.workspace_id, Some(5));
        assert!(cfg.backup.schedule.include_uploads);
        assert_eq!(cfg.backup.schedule.time_of_day().unwrap(), (3, 30));
        cfg.database.validate().unwrap();
        cfg.backup.validate().unwrap();
    }

    #[test]
    fn defaults_are_descriptive_only() {
        let cfg = AppConfig::default();
        assert!(!cfg.backup.schedule.enabled);
        assert_eq!(cfg.backup.schedule.interval, ScheduleInterval::Daily);
        assert_eq!(cfg.backup.schedule.time, "02:00");
        assert_eq!(cfg.backup.backup_dir, PathBuf::from("backups"));
    }

    #[test]
    fn rejects_bad_schedule_values() {
        let mut s = ScheduleConfig::default();
        s.time = "25:00".into();
        assert!(s.validate().is_err());

        let mut s = ScheduleConfig::default();
        s.retention_days = 0;
        assert!(s.validate().is_err());

        let mut s = ScheduleConfig::default();
        s.interval = ScheduleInterval::Monthly;
        s.day = Some(31);
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_unsupported_database_url() {
        let db = DatabaseConfig { url: "mysql://localhost/app".into(), min_connections: 1, max_connections: 2, connect_timeout_secs: 1, acquire_timeout_secs: 1, ..Default::default() };
        assert!(db.validate().is_err());
    }

    #[test]
    fn interval_from_str() {
        assert_eq!("Hourly".parse::<ScheduleInterval>().unwrap(), ScheduleInterval::Hourly);
        assert!("yearly".parse::<ScheduleInterval>().is_err());
    }
}
