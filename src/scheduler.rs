//! Periodic reconciliation trigger.
//!
//! Fires `update_all` at the configured cron times (server local time). One
//! run is started immediately when the scheduler starts.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use cron::Schedule;
use tokio::sync::watch;

use crate::error::ConfigError;
use crate::reconcile::LotteryUpdater;

/// Default fire times, Monday to Saturday, five-field cron syntax.
pub const DEFAULT_SCHEDULES: [&str; 7] = [
    "0 12 * * MON-SAT",
    "0 21 * * MON-SAT",
    "15 21 * * MON-SAT",
    "0 22 * * MON-SAT",
    "10 23 * * MON-SAT",
    "20 0 * * MON-SAT",
    "0 1 * * MON-SAT",
];

/// Parse a cron expression. Five-field expressions get a zero seconds field.
pub fn parse_schedule(expr: &str) -> Result<Schedule, ConfigError> {
    let trimmed = expr.trim();
    let normalized = if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_string()
    };

    Schedule::from_str(&normalized).map_err(|e| ConfigError::InvalidSchedule {
        expr: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Build the schedule set: the override alone when given, else the defaults.
pub fn build_schedules(custom: Option<&str>) -> Result<Vec<Schedule>, ConfigError> {
    match custom {
        Some(expr) => Ok(vec![parse_schedule(expr)?]),
        None => DEFAULT_SCHEDULES.iter().map(|e| parse_schedule(e)).collect(),
    }
}

/// Earliest fire time strictly after `after` across all schedules.
pub fn next_fire<Tz: TimeZone>(schedules: &[Schedule], after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    schedules.iter().filter_map(|s| s.after(after).next()).min()
}

pub struct UpdateScheduler {
    updater: Arc<LotteryUpdater>,
    schedules: Vec<Schedule>,
}

impl UpdateScheduler {
    pub fn new(updater: Arc<LotteryUpdater>, custom: Option<&str>) -> Result<Self, ConfigError> {
        let schedules = build_schedules(custom)?;
        match custom {
            Some(expr) => tracing::info!(schedule = expr, "using custom update schedule"),
            None => tracing::info!(count = schedules.len(), "using default update schedules"),
        }
        Ok(Self { updater, schedules })
    }

    /// Run until the shutdown signal is received.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!("scheduler started, running initial update");
        self.spawn_update();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let now = Local::now();
            let Some(next) = next_fire(&self.schedules, &now) else {
                tracing::warn!("no upcoming fire time, scheduler idle until shutdown");
                let _ = shutdown_rx.changed().await;
                break;
            };
            let wait = (next.clone() - now).to_std().unwrap_or_default();
            tracing::debug!(next = %next, wait_secs = wait.as_secs(), "next scheduled update");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    tracing::info!("running scheduled update");
                    self.spawn_update();
                }
                _ = shutdown_rx.changed() => break,
            }
        }

        tracing::info!("scheduler stopped");
    }

    fn spawn_update(&self) {
        let updater = Arc::clone(&self.updater);
        tokio::spawn(async move {
            let summary = updater.update_all().await;
            tracing::info!(
                succeeded = summary.succeeded(),
                failed = summary.failed(),
                "scheduled update completed"
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Utc, Weekday};

    #[test]
    fn test_five_field_expression_is_normalized() {
        let schedule = parse_schedule("15 21 * * MON-SAT").unwrap();
        // 2024-06-02 is a Sunday
        let after = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
        let next = schedule.after(&after).next().unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!((next.hour(), next.minute(), next.second()), (21, 15, 0));
    }

    #[test]
    fn test_six_field_expression_passes_through() {
        assert!(parse_schedule("30 0 12 * * MON-SAT").is_ok());
    }

    #[test]
    fn test_invalid_expression_is_config_error() {
        let err = parse_schedule("every day at noon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSchedule { .. }));
    }

    #[test]
    fn test_defaults_parse_and_pick_earliest() {
        let schedules = build_schedules(None).unwrap();
        assert_eq!(schedules.len(), DEFAULT_SCHEDULES.len());

        // Monday 21:05 → 21:15 the same evening
        let after = Utc.with_ymd_and_hms(2024, 6, 3, 21, 5, 0).unwrap();
        let next = next_fire(&schedules, &after).unwrap();
        assert_eq!((next.day(), next.hour(), next.minute()), (3, 21, 15));

        // Saturday 23:30 → 00:20 Sunday is outside MON-SAT, so Monday 00:20
        let after = Utc.with_ymd_and_hms(2024, 6, 8, 23, 30, 0).unwrap();
        let next = next_fire(&schedules, &after).unwrap();
        assert_eq!(next.weekday(), Weekday::Mon);
        assert_eq!((next.hour(), next.minute()), (0, 20));
    }

    #[test]
    fn test_override_replaces_defaults() {
        let schedules = build_schedules(Some("*/5 * * * *")).unwrap();
        assert_eq!(schedules.len(), 1);
    }
}
