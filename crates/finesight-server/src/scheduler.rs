//! Background task scheduler for the recurring-occurrence advancer
//!
//! Runs once a day at local midnight. Disable with `serve --no-recurring`
//! or `FINESIGHT_RECURRING=off`; `finesight recurring run` triggers the same
//! job by hand.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use tracing::{error, info};

use finesight_core::{models::today, recurring, SharedStore};

/// Time from `now` until the next local midnight
///
/// Falls back to one hour when midnight does not exist locally (DST gap).
pub fn next_midnight_delay(now: DateTime<Local>) -> Duration {
    let tomorrow = now.date_naive().succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0));

    tomorrow
        .and_then(|midnight: NaiveDateTime| Local.from_local_datetime(&midnight).earliest())
        .and_then(|midnight| (midnight - now).to_std().ok())
        .unwrap_or(Duration::from_secs(3600))
}

/// Start the recurring scheduler as a background task
///
/// This function spawns a tokio task that runs indefinitely, processing due
/// recurring templates right after each local midnight.
pub fn start_recurring_scheduler(store: SharedStore) {
    info!("Starting recurring scheduler: daily at local midnight");

    tokio::spawn(async move {
        loop {
            let delay = next_midnight_delay(Local::now());
            tokio::time::sleep(delay).await;

            let run_date = today();
            info!(run_date = %run_date, "Running scheduled recurring job...");

            let job_store = store.clone();
            match tokio::task::spawn_blocking(move || recurring::run_due(job_store.as_ref(), run_date))
                .await
            {
                Ok(Ok(report)) => {
                    info!(
                        "Scheduled recurring job completed: {} created, {} skipped, {} failed",
                        report.processed, report.skipped_already_run, report.failed
                    );
                }
                Ok(Err(e)) => {
                    error!("Scheduled recurring job failed: {}", e);
                }
                Err(e) => {
                    error!("Scheduled recurring job panicked: {}", e);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_until_midnight() {
        let now = Local.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).earliest().unwrap();
        let delay = next_midnight_delay(now);
        assert!(delay > Duration::from_secs(0));
        assert!(delay <= Duration::from_secs(13 * 3600));
    }

    #[test]
    fn test_delay_just_before_midnight() {
        let now = Local.with_ymd_and_hms(2024, 7, 1, 23, 59, 30).earliest().unwrap();
        let delay = next_midnight_delay(now);
        assert!(delay <= Duration::from_secs(3600));
    }
}
