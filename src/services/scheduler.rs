use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::services::reminder_service::ReminderService;

/// Periodic trigger for the reminder evaluator. A daily interval is plenty
/// for a 30-day send window; the exact cadence is not load-bearing.
pub struct ReminderScheduler {
    service: Arc<ReminderService>,
    interval: Duration,
}

impl ReminderScheduler {
    pub fn new(service: Arc<ReminderService>, interval_secs: u64) -> Self {
        Self {
            service,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Runs the evaluator in an endless sleep/run loop.
    pub async fn start(self) {
        info!("Starting reminder scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            match self.service.run().await {
                Ok(stats) => {
                    info!(
                        "Scheduled reminder run - Loaded: {}, sent: {}, skipped: {}, failed: {}",
                        stats.loaded, stats.sent, stats.skipped, stats.failed
                    );
                }
                Err(e) => {
                    tracing::warn!("Scheduled reminder run failed: {:?}", e);
                    // Keep looping; the next pass retries everything still
                    // pending.
                }
            }
        }
    }
}
