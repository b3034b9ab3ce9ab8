//! Perpetual scheduler loop
//!
//! Sleeps until the next cron fire time, runs one cycle, repeats. The schedule
//! is re-read before every sleep so a changed `post-generation-schedule`
//! setting takes effect without a restart. A failed cycle is logged and the
//! loop carries on.

use chrono::{DateTime, Local};
use eyre::{Result, eyre};
use placestore::StoreLock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::parse_schedule;
use crate::cycle::CycleRunner;

/// Next fire time strictly after `after`
pub fn next_fire_time(expr: &str, after: DateTime<Local>) -> Result<DateTime<Local>> {
    let schedule = parse_schedule(expr)?;
    schedule
        .after(&after)
        .next()
        .ok_or_else(|| eyre!("Cron expression '{}' never fires", expr))
}

/// Owns the runner and the repository lock for the lifetime of `np run`
pub struct Daemon {
    runner: CycleRunner,
    _lock: StoreLock,
}

impl Daemon {
    pub fn new(runner: CycleRunner, lock: StoreLock) -> Self {
        debug!(lock = %lock.path().display(), "Daemon::new: called");
        Self { runner, _lock: lock }
    }

    /// Run cycles on schedule until a message arrives on `shutdown`
    pub async fn run(&self, mut shutdown: mpsc::Receiver<()>) -> Result<()> {
        debug!("Daemon::run: called");
        loop {
            let schedule = match self.runner.tunables().await {
                Ok(tunables) => tunables.schedule,
                Err(e) => {
                    error!(error = %e, "Failed to read tunables, stopping");
                    return Err(e.into());
                }
            };

            let now = Local::now();
            let next = next_fire_time(&schedule, now)?;
            let wait = (next - now).to_std().unwrap_or_default();
            info!(%schedule, next = %next.format("%Y-%m-%d %H:%M:%S %Z"), "Sleeping until next cycle");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.recv() => {
                    info!("Shutdown requested");
                    break;
                }
            }

            let date = Local::now().date_naive();
            match self.runner.run(date).await {
                Ok(outcome) => {
                    debug!(kind = %outcome.kind, post_id = outcome.post.id, "Daemon::run: cycle done");
                }
                Err(e) => warn!(error = %e, "Cycle failed, retrying at the next fire time"),
            }
        }

        if let Err(e) = self.runner.state().shutdown().await {
            warn!(error = %e, "State manager did not shut down cleanly");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_next_fire_time_five_field() {
        let after = Local.with_ymd_and_hms(2024, 6, 3, 9, 30, 0).unwrap();
        let next = next_fire_time("0 8 * * *", after).unwrap();
        assert_eq!(next.date_naive(), after.date_naive().succ_opt().unwrap());
        assert_eq!((next.hour(), next.minute()), (8, 0));
    }

    #[test]
    fn test_next_fire_time_same_day() {
        let after = Local.with_ymd_and_hms(2024, 6, 3, 6, 0, 0).unwrap();
        let next = next_fire_time("30 7 * * *", after).unwrap();
        assert_eq!(next.date_naive(), after.date_naive());
        assert_eq!((next.hour(), next.minute()), (7, 30));
    }

    #[test]
    fn test_next_fire_time_rejects_garbage() {
        assert!(next_fire_time("every morning", Local::now()).is_err());
    }
}
