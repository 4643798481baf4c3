//! Periodic backups with retention pruning, driven by `[backup.schedule]`.

use std::future::Future;

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;
use tracing::{error, info, warn};

use configs::{ScheduleConfig, ScheduleInterval};

use super::archive::BackupInfo;
use super::errors::BackupError;
use super::writer::BackupRequest;
use super::BackupService;

/// First fire time strictly after `now`. `day` is the weekday for weekly
/// schedules (0 = Monday) and the day of month for monthly ones (clamped to
/// 1..=28). Hourly schedules only use `minute`.
pub fn next_run(
    now: NaiveDateTime,
    interval: ScheduleInterval,
    (hour, minute): (u32, u32),
    day: Option<u32>,
) -> Option<NaiveDateTime> {
    let at = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let next = match interval {
        ScheduleInterval::Hourly => {
            let candidate = now.date().and_hms_opt(now.hour(), minute, 0)?;
            if candidate > now { candidate } else { candidate + Duration::hours(1) }
        }
        ScheduleInterval::Daily => {
            let candidate = now.date().and_time(at);
            if candidate > now { candidate } else { candidate + Duration::days(1) }
        }
        ScheduleInterval::Weekly => {
            let weekday = day.unwrap_or(0).min(6);
            let today = now.weekday().num_days_from_monday();
            let ahead = (weekday + 7 - today) % 7;
            let candidate = (now.date() + Duration::days(i64::from(ahead))).and_time(at);
            if candidate > now { candidate } else { candidate + Duration::days(7) }
        }
        ScheduleInterval::Monthly => {
            let dom = day.unwrap_or(1).clamp(1, 28);
            let candidate = NaiveDate::from_ymd_opt(now.year(), now.month(), dom)?.and_time(at);
            if candidate > now {
                candidate
            } else {
                let (year, month) = if now.month() == 12 { (now.year() + 1, 1) } else { (now.year(), now.month() + 1) };
                NaiveDate::from_ymd_opt(year, month, dom)?.and_time(at)
            }
        }
    };
    Some(next)
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledRun {
    pub backup: BackupInfo,
    pub pruned: Vec<String>,
}

pub struct BackupScheduler {
    service: BackupService,
    config: ScheduleConfig,
    time: (u32, u32),
}

impl BackupScheduler {
    pub fn new(service: BackupService, config: ScheduleConfig) -> Result<Self, BackupError> {
        let time = config.time_of_day().map_err(|e| BackupError::Config(e.to_string()))?;
        Ok(Self { service, config, time })
    }

    pub fn next_after(&self, now: NaiveDateTime) -> Result<NaiveDateTime, BackupError> {
        next_run(now, self.config.interval, self.time, self.config.day)
            .ok_or_else(|| BackupError::Config(format!("no next run for schedule `{}`", self.config.time)))
    }

    /// One backup of the configured scope followed by pruning.
    pub async fn run_once(&self, now: NaiveDateTime) -> Result<ScheduledRun, BackupError> {
        let backup = self
            .service
            .create(BackupRequest {
                workspace_id: self.config.workspace_id,
                include_uploads: self.config.include_uploads,
                tables: self.config.tables.clone(),
                name: None,
            })
            .await?;
        let pruned = self.prune_expired(now).await?;
        Ok(ScheduledRun { backup, pruned })
    }

    /// Delete archives of the configured scope created more than
    /// `retention_days` before `now`. Archives whose timestamp cannot be
    /// parsed are kept.
    pub async fn prune_expired(&self, now: NaiveDateTime) -> Result<Vec<String>, BackupError> {
        let cutoff = now - Duration::days(i64::from(self.config.retention_days));
        let mut pruned = Vec::new();
        for backup in self.service.list(self.config.workspace_id).await? {
            if backup.workspace_id != self.config.workspace_id {
                continue;
            }
            let Some(created_at) = backup.created_at else { continue };
            if created_at >= cutoff {
                continue;
            }
            match self.service.try_delete(&backup.path).await {
                Ok(()) => pruned.push(backup.filename),
                Err(e) => warn!(file = %backup.filename, error = %e, "could not prune expired backup"),
            }
        }
        if !pruned.is_empty() {
            info!(count = pruned.len(), retention_days = self.config.retention_days, "expired backups pruned");
        }
        Ok(pruned)
    }

    /// Sleep until each fire time and run; returns once `shutdown` resolves.
    pub async fn run<F: Future<Output = ()>>(&self, shutdown: F) -> Result<(), BackupError> {
        tokio::pin!(shutdown);
        loop {
            let now = Local::now().naive_local();
            let next = self.next_after(now)?;
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, interval = self.config.interval.as_str(), "next scheduled backup");
            tokio::select! {
                _ = &mut shutdown => {
                    info!("backup scheduler stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(wait) => {
                    match self.run_once(Local::now().naive_local()).await {
                        Ok(run) => info!(file = %run.backup.filename, pruned = run.pruned.len(), "scheduled backup finished"),
                        Err(e) => error!(error = %e, "scheduled backup failed"),
                    }
                }
            }
        }
    }
}
