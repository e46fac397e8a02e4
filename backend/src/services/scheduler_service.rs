use std::time::Duration;

use chrono::{NaiveDateTime, Utc};

use crate::services::persistence_service;
use crate::AppState;

const HOURLY: Duration = Duration::from_secs(3600);

/// Time from `now` until the next `hour`:00 local time.
pub fn duration_until_next_run(now: NaiveDateTime, hour: u32) -> Duration {
    let Some(today) = now.date().and_hms_opt(hour, 0, 0) else {
        return HOURLY;
    };
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(HOURLY)
}

/// Rebuilds every wheel once a night and saves the statistics.
pub fn spawn_nightly_rebuild(state: AppState) {
    tokio::spawn(async move {
        loop {
            let wait = duration_until_next_run(
                chrono::Local::now().naive_local(),
                state.config.nightly_hour,
            );
            tracing::debug!("Next nightly rebuild in {} minute(s)", wait.as_secs() / 60);
            tokio::time::sleep(wait).await;

            let records = {
                let mut plugin = state.plugin.lock().await;
                plugin.nightly_update();
                plugin.ledger_records()
            };
            tracing::info!("Nightly rebuild done for {} chat(s)", records.len());
            if let Err(e) = persistence_service::save_ledgers(&state.config.data_file, &records).await {
                tracing::error!("Error saving statistics after the nightly rebuild: {}", e);
            }
        }
    });
}

/// Drops expired effects and refills skipped slots every hour.
pub fn spawn_hourly_tick(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HOURLY);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            state.plugin.lock().await.hourly_tick(Utc::now());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(duration_until_next_run(at(1, 30), 3), Duration::from_secs(90 * 60));
    }

    #[test]
    fn test_next_run_tomorrow() {
        assert_eq!(duration_until_next_run(at(0, 0), 0), Duration::from_secs(24 * 3600));
        assert_eq!(duration_until_next_run(at(23, 0), 0), Duration::from_secs(3600));
    }

    #[test]
    fn test_invalid_hour_falls_back() {
        assert_eq!(duration_until_next_run(at(12, 0), 25), HOURLY);
    }
}
