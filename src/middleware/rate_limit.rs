use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::config::{CleanupHeaderMode, Settings};
use crate::domain::services::is_exec_path;
use crate::error::AppError;
use crate::infrastructure::{CleanupSchedule, SharedStore};
use crate::infrastructure::store::StoreResult;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_USED: &str = "x-ratelimit-used";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
pub const NEXT_CLEANUP_TIME: &str = "x-next-cleanup-time";
pub const LAST_CLEANUP_TIME: &str = "x-last-cleanup-time";

/// Fixed-window admission control backed by counters in a shared store.
///
/// Windows are `floor(now / window_secs)` buckets, so a burst straddling a
/// boundary can see up to twice the limit across two windows. Counters expire
/// through the store's TTL; nothing here deletes them.
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedStore,
    limit: i64,
    window_secs: i64,
    schedule: CleanupSchedule,
    header_mode: CleanupHeaderMode,
}

/// What the cleanup header reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupReport {
    SecondsUntilNext(i64),
    LastRunMs(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: i64,
    pub used: i64,
    pub remaining: i64,
    /// Unix seconds at which the next window starts
    pub reset: i64,
    pub cleanup: CleanupReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted(RateLimitStatus),
    Rejected(RateLimitStatus),
}

impl RateLimiter {
    pub fn new(
        store: SharedStore,
        limit: i64,
        window_secs: i64,
        schedule: CleanupSchedule,
        header_mode: CleanupHeaderMode,
    ) -> Self {
        Self {
            store,
            limit,
            window_secs: window_secs.max(1),
            schedule,
            header_mode,
        }
    }

    pub fn from_settings(store: SharedStore, settings: &Settings) -> Self {
        Self::new(
            store,
            settings.rate_limit.limit,
            settings.rate_limit.window_secs,
            CleanupSchedule::new(
                settings.cleanup.last_cleanup_key(),
                settings.cleanup.interval(),
            ),
            settings.cleanup.header_mode,
        )
    }

    pub fn window_id(&self, now_secs: i64) -> i64 {
        now_secs.div_euclid(self.window_secs)
    }

    pub fn window_key(window_id: i64) -> String {
        format!("request_count:{}", window_id)
    }

    pub async fn check(&self) -> StoreResult<Admission> {
        self.check_at(Utc::now().timestamp_millis()).await
    }

    /// Admits or rejects one request observed at `now_ms`.
    ///
    /// The read is only a fast path. The post-increment value decides, which
    /// keeps the number admitted per window at or below the limit even when
    /// many requests read the same count concurrently.
    pub async fn check_at(&self, now_ms: i64) -> StoreResult<Admission> {
        let window_id = self.window_id(now_ms.div_euclid(1000));
        let key = Self::window_key(window_id);
        tracing::debug!(key = %key, "Checking rate limit window");

        let current = self.current_count(&key).await?;
        if current >= self.limit {
            tracing::warn!(key = %key, count = current, "Request limit exceeded");
            let status = self.status(window_id, current, now_ms).await?;
            return Ok(Admission::Rejected(status));
        }

        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.set_window_ttl(&key).await?;
        }

        let status = self.status(window_id, count, now_ms).await?;
        if count > self.limit {
            tracing::warn!(key = %key, count, "Request limit exceeded");
            return Ok(Admission::Rejected(status));
        }

        tracing::debug!(key = %key, count, "Request admitted");
        Ok(Admission::Admitted(status))
    }

    /// Current window usage without counting a request.
    pub async fn snapshot_at(&self, now_ms: i64) -> StoreResult<RateLimitStatus> {
        let window_id = self.window_id(now_ms.div_euclid(1000));
        let current = self.current_count(&Self::window_key(window_id)).await?;
        self.status(window_id, current, now_ms).await
    }

    pub async fn snapshot(&self) -> StoreResult<RateLimitStatus> {
        self.snapshot_at(Utc::now().timestamp_millis()).await
    }

    /// A counter without a TTL would never leave the admin store, so a
    /// failed EXPIRE gets one more attempt before the request fails.
    async fn set_window_ttl(&self, key: &str) -> StoreResult<()> {
        let ttl = Duration::from_secs(self.window_secs as u64);
        if let Err(e) = self.store.expire(key, ttl).await {
            tracing::warn!(key = %key, error = %e, "Failed to set window TTL, retrying");
            self.store.expire(key, ttl).await?;
        }
        Ok(())
    }

    async fn current_count(&self, key: &str) -> StoreResult<i64> {
        match self.store.get(key).await? {
            None => Ok(0),
            Some(raw) => raw.trim().parse().map_err(|_| {
                crate::infrastructure::StoreError::Protocol(format!(
                    "request counter {} holds '{}'",
                    key, raw
                ))
            }),
        }
    }

    async fn status(&self, window_id: i64, used: i64, now_ms: i64) -> StoreResult<RateLimitStatus> {
        let cleanup = match self.header_mode {
            CleanupHeaderMode::Next => CleanupReport::SecondsUntilNext(
                self.schedule.seconds_until_next(&self.store, now_ms).await?,
            ),
            CleanupHeaderMode::Last => CleanupReport::LastRunMs(
                self.schedule
                    .last_cleanup_ms(&self.store)
                    .await?
                    .unwrap_or(0),
            ),
        };

        Ok(RateLimitStatus {
            limit: self.limit,
            used,
            remaining: (self.limit - used).max(0),
            reset: (window_id + 1) * self.window_secs,
            cleanup,
        })
    }
}

impl RateLimitStatus {
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATE_LIMIT_USED, HeaderValue::from(self.used));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from(self.reset));

        let cleanup_header = match self.cleanup {
            CleanupReport::SecondsUntilNext(secs) => {
                headers.insert(NEXT_CLEANUP_TIME, HeaderValue::from(secs));
                NEXT_CLEANUP_TIME
            },
            CleanupReport::LastRunMs(ms) => {
                headers.insert(LAST_CLEANUP_TIME, HeaderValue::from(ms));
                LAST_CLEANUP_TIME
            },
        };

        let exposed = [
            RATE_LIMIT_LIMIT,
            RATE_LIMIT_REMAINING,
            RATE_LIMIT_USED,
            RATE_LIMIT_RESET,
            cleanup_header,
        ]
        .join(", ");
        if let Ok(value) = HeaderValue::from_str(&exposed) {
            headers.insert(
                HeaderName::from_static("access-control-expose-headers"),
                value,
            );
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !is_exec_path(request.uri().path()) {
        return next.run(request).await;
    }

    match limiter.check().await {
        Ok(Admission::Admitted(status)) => {
            let mut response = next.run(request).await;
            status.apply_headers(response.headers_mut());
            response
        },
        Ok(Admission::Rejected(status)) => {
            let mut response = AppError::RateLimited.into_response();
            status.apply_headers(response.headers_mut());
            response
        },
        Err(e) => {
            tracing::error!(error = %e, "Rate limiter could not reach the store");
            AppError::Internal(format!("rate limiter unavailable: {}", e)).into_response()
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::infrastructure::store::testing::UnreachableStore;
    use crate::infrastructure::{KvStore, MemoryStore};

    const CLEANUP_KEY: &str = "playground_mono:last_cron_cleanup_run_time_unix_ms";
    // 2023-11-14T22:13:00Z, aligned to a minute boundary
    const T0_MS: i64 = 1_699_999_980_000;

    fn limiter(store: &MemoryStore, limit: i64, window_secs: i64) -> RateLimiter {
        RateLimiter::new(
            Arc::new(store.clone()),
            limit,
            window_secs,
            CleanupSchedule::new(CLEANUP_KEY, Duration::from_secs(900)),
            CleanupHeaderMode::Next,
        )
    }

    fn outcome(admission: Admission) -> (bool, RateLimitStatus) {
        match admission {
            Admission::Admitted(status) => (true, status),
            Admission::Rejected(status) => (false, status),
        }
    }

    #[test]
    fn windows_are_fixed_buckets() {
        let limiter = limiter(&MemoryStore::new(), 3, 60);
        assert_eq!(limiter.window_id(119), 1);
        assert_eq!(limiter.window_id(120), 2);
        assert_eq!(RateLimiter::window_key(2), "request_count:2");
    }

    #[tokio::test]
    async fn admits_up_to_limit_then_rejects() {
        let store = MemoryStore::new();
        let limiter = limiter(&store, 3, 60);

        let mut remaining = Vec::new();
        for i in 0..3 {
            let (admitted, status) = outcome(limiter.check_at(T0_MS + i * 1000).await.unwrap());
            assert!(admitted);
            remaining.push(status.remaining);
        }
        assert_eq!(remaining, vec![2, 1, 0]);

        let (admitted, status) = outcome(limiter.check_at(T0_MS + 30_000).await.unwrap());
        assert!(!admitted);
        assert_eq!(status.remaining, 0);
        assert_eq!(status.used, 3);
        assert_eq!(status.reset, T0_MS / 1000 + 60);
    }

    #[tokio::test]
    async fn next_window_starts_fresh() {
        let store = MemoryStore::new();
        let limiter = limiter(&store, 1, 60);

        assert!(outcome(limiter.check_at(T0_MS).await.unwrap()).0);
        assert!(!outcome(limiter.check_at(T0_MS + 59_999).await.unwrap()).0);
        assert!(outcome(limiter.check_at(T0_MS + 60_000).await.unwrap()).0);
    }

    #[tokio::test]
    async fn first_increment_sets_window_ttl() {
        let store = MemoryStore::new();
        let limiter = limiter(&store, 5, 60);

        limiter.check_at(T0_MS).await.unwrap();

        let key = RateLimiter::window_key(limiter.window_id(T0_MS / 1000));
        let ttl = store.ttl(&key).expect("counter has a ttl");
        assert!(ttl <= Duration::from_secs(60));
        assert!(ttl > Duration::from_secs(55));
    }

    /// Delegates to a [`MemoryStore`] but fails the first `failures` EXPIREs.
    struct FlakyExpireStore {
        inner: MemoryStore,
        failures: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl KvStore for FlakyExpireStore {
        async fn execute(
            &self,
            command: &crate::domain::models::CommandRequest,
        ) -> StoreResult<crate::domain::models::RawReply> {
            self.inner.execute(command).await
        }

        async fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
            self.inner.set(key, value).await
        }

        async fn incr(&self, key: &str) -> StoreResult<i64> {
            self.inner.incr(key).await
        }

        async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
            use std::sync::atomic::Ordering;
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(crate::infrastructure::StoreError::Unavailable(
                    "connection reset".to_string(),
                ));
            }
            self.inner.expire(key, ttl).await
        }

        async fn flush_db(&self) -> StoreResult<()> {
            self.inner.flush_db().await
        }

        async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
            self.inner.keys(pattern).await
        }

        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }
    }

    fn flaky_limiter(store: &MemoryStore, failures: usize) -> RateLimiter {
        RateLimiter::new(
            Arc::new(FlakyExpireStore {
                inner: store.clone(),
                failures: std::sync::atomic::AtomicUsize::new(failures),
            }),
            5,
            60,
            CleanupSchedule::new(CLEANUP_KEY, Duration::from_secs(900)),
            CleanupHeaderMode::Next,
        )
    }

    #[tokio::test]
    async fn failed_window_ttl_is_retried() {
        let store = MemoryStore::new();
        let limiter = flaky_limiter(&store, 1);

        assert!(outcome(limiter.check_at(T0_MS).await.unwrap()).0);

        let key = RateLimiter::window_key(limiter.window_id(T0_MS / 1000));
        assert!(store.ttl(&key).is_some());
    }

    #[tokio::test]
    async fn persistent_ttl_failure_fails_the_request() {
        let store = MemoryStore::new();
        let limiter = flaky_limiter(&store, 2);

        let err = limiter.check_at(T0_MS).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn counter_resets_when_ttl_expires() {
        let store = MemoryStore::new();
        let limiter = limiter(&store, 1, 1);
        let key = RateLimiter::window_key(limiter.window_id(T0_MS / 1000));

        assert!(outcome(limiter.check_at(T0_MS).await.unwrap()).0);
        assert!(!outcome(limiter.check_at(T0_MS).await.unwrap()).0);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(store.get(&key).await.unwrap(), None);
        assert!(outcome(limiter.check_at(T0_MS).await.unwrap()).0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_requests_never_exceed_limit() {
        let store = MemoryStore::new();
        let limit = 20;
        let limiter = limiter(&store, limit, 60);

        let tasks: Vec<_> = (0..=limit)
            .chain(0..30)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.check_at(T0_MS).await.unwrap() })
            })
            .collect();

        let mut admitted = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Admission::Admitted(_) => admitted += 1,
                Admission::Rejected(_) => rejected += 1,
            }
        }

        assert_eq!(admitted, limit);
        assert_eq!(rejected, 31);
    }

    #[tokio::test]
    async fn reports_seconds_until_next_cleanup() {
        let store = MemoryStore::new();
        store
            .set(CLEANUP_KEY, &(T0_MS - 300_000).to_string())
            .await
            .unwrap();
        let limiter = limiter(&store, 3, 60);

        let (_, status) = outcome(limiter.check_at(T0_MS).await.unwrap());
        assert_eq!(status.cleanup, CleanupReport::SecondsUntilNext(600));

        store.set(CLEANUP_KEY, "0").await.unwrap();
        let (_, status) = outcome(limiter.check_at(T0_MS).await.unwrap());
        assert_eq!(status.cleanup, CleanupReport::SecondsUntilNext(0));
    }

    #[tokio::test]
    async fn can_report_last_cleanup_time_instead() {
        let store = MemoryStore::new();
        store.set(CLEANUP_KEY, "1234").await.unwrap();
        let limiter = RateLimiter::new(
            Arc::new(store.clone()),
            3,
            60,
            CleanupSchedule::new(CLEANUP_KEY, Duration::from_secs(900)),
            CleanupHeaderMode::Last,
        );

        let (_, status) = outcome(limiter.check_at(T0_MS).await.unwrap());
        assert_eq!(status.cleanup, CleanupReport::LastRunMs(1234));

        let mut headers = HeaderMap::new();
        status.apply_headers(&mut headers);
        assert_eq!(headers[LAST_CLEANUP_TIME], "1234");
        assert!(headers.get(NEXT_CLEANUP_TIME).is_none());
    }

    #[tokio::test]
    async fn snapshot_does_not_count() {
        let store = MemoryStore::new();
        let limiter = limiter(&store, 3, 60);

        limiter.check_at(T0_MS).await.unwrap();
        let snapshot = limiter.snapshot_at(T0_MS).await.unwrap();
        let again = limiter.snapshot_at(T0_MS).await.unwrap();

        assert_eq!(snapshot.used, 1);
        assert_eq!(again.used, 1);
        assert_eq!(again.remaining, 2);
    }

    #[tokio::test]
    async fn store_failure_is_an_error() {
        let limiter = RateLimiter::new(
            Arc::new(UnreachableStore),
            3,
            60,
            CleanupSchedule::new(CLEANUP_KEY, Duration::from_secs(900)),
            CleanupHeaderMode::Next,
        );

        let err = limiter.check_at(T0_MS).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn headers_are_exposed_to_browsers() {
        let status = RateLimitStatus {
            limit: 3,
            used: 1,
            remaining: 2,
            reset: 60,
            cleanup: CleanupReport::SecondsUntilNext(10),
        };
        let mut headers = HeaderMap::new();
        status.apply_headers(&mut headers);

        assert_eq!(headers[RATE_LIMIT_LIMIT], "3");
        assert_eq!(headers[RATE_LIMIT_REMAINING], "2");
        assert_eq!(headers[RATE_LIMIT_USED], "1");
        assert_eq!(headers[RATE_LIMIT_RESET], "60");
        assert_eq!(headers[NEXT_CLEANUP_TIME], "10");
        assert_eq!(
            headers["access-control-expose-headers"],
            "x-ratelimit-limit, x-ratelimit-remaining, x-ratelimit-used, x-ratelimit-reset, x-next-cleanup-time"
        );
    }
}
