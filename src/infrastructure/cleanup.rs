use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::infrastructure::store::{SharedStore, StoreError, StoreResult};

/// Where the last cleanup time lives and how often cleanups happen.
///
/// This is the only thing the rate limiter and the coordinator share; the
/// limiter reads the key, the coordinator is its only writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupSchedule {
    key: String,
    interval: Duration,
}

impl CleanupSchedule {
    pub fn new(key: impl Into<String>, interval: Duration) -> Self {
        Self {
            key: key.into(),
            interval,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Unix milliseconds of the last completed cleanup, if one was recorded.
    pub async fn last_cleanup_ms(&self, admin: &SharedStore) -> StoreResult<Option<i64>> {
        match admin.get(&self.key).await? {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<i64>().map(Some).map_err(|_| {
                StoreError::Protocol(format!("{} holds a non-integer value '{}'", self.key, raw))
            }),
        }
    }

    /// Whole seconds until the next cleanup, never negative.
    pub async fn seconds_until_next(&self, admin: &SharedStore, now_ms: i64) -> StoreResult<i64> {
        let last_ms = self.last_cleanup_ms(admin).await?.unwrap_or(0);
        Ok(seconds_until(last_ms, self.interval, now_ms))
    }
}

fn seconds_until(last_ms: i64, interval: Duration, now_ms: i64) -> i64 {
    let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
    let next_ms = last_ms.saturating_add(interval_ms);
    (next_ms.saturating_sub(now_ms) / 1000).max(0)
}

/// Periodically flushes the demo store and records when it did so in the
/// admin store.
pub struct CleanupCoordinator {
    demo: SharedStore,
    admin: SharedStore,
    schedule: CleanupSchedule,
    cancel_token: CancellationToken,
}

impl CleanupCoordinator {
    pub fn new(
        demo: SharedStore,
        admin: SharedStore,
        schedule: CleanupSchedule,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            demo,
            admin,
            schedule,
            cancel_token,
        }
    }

    pub async fn run(self) {
        tracing::info!(
            "Starting cleanup coordinator with {}s interval",
            self.schedule.interval().as_secs()
        );

        if let Err(e) = self.init_last_cleanup_time().await {
            tracing::error!("Failed to initialize last cleanup time: {}", e);
        }

        let period = self.schedule.interval();
        let mut interval = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    tracing::info!("Cleanup coordinator shutting down");
                    break;
                }
                _ = interval.tick() => {
                    tokio::select! {
                        _ = self.cancel_token.cancelled() => {
                            tracing::info!("Cleanup coordinator shutting down mid-cycle");
                            break;
                        }
                        result = self.run_once() => {
                            if let Err(e) = result {
                                tracing::error!("Cleanup cycle failed: {}", e);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Records "now" as the last cleanup time when no value exists yet, so
    /// the first interval is measured from startup.
    pub async fn init_last_cleanup_time(&self) -> StoreResult<()> {
        if self.admin.get(self.schedule.key()).await?.is_some() {
            return Ok(());
        }

        let now = Utc::now().timestamp_millis();
        tracing::debug!(key = self.schedule.key(), now, "Defaulting last cleanup time");
        self.admin.set(self.schedule.key(), &now.to_string()).await
    }

    /// One cleanup cycle. The timestamp is only written after the flush is
    /// confirmed.
    pub async fn run_once(&self) -> StoreResult<()> {
        tracing::info!("Flushing demo store");
        self.demo.flush_db().await?;

        let now = Utc::now().timestamp_millis();
        self.admin
            .set(self.schedule.key(), &now.to_string())
            .await?;

        tracing::info!(cleaned_at = now, "Demo store cleaned up");
        Ok(())
    }
}

pub fn spawn_cleanup_coordinator(
    demo: SharedStore,
    admin: SharedStore,
    schedule: CleanupSchedule,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let coordinator = CleanupCoordinator::new(demo, admin, schedule, cancel_token);

    tokio::spawn(async move {
        coordinator.run().await;
    })
}
