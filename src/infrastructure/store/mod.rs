mod memory;
mod redis;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Settings, StoreBackend};
use crate::domain::models::{CommandRequest, RawReply};

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Command(String),

    #[error("unexpected store reply: {0}")]
    Protocol(String),
}

impl StoreError {
    /// True when the store could not be reached at all, as opposed to the
    /// store rejecting what was sent to it.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Access to one key-value store instance.
///
/// The gateway holds no in-process counters; everything that has to be
/// shared between gateway instances goes through these calls, so `incr`
/// must be atomic on the store side.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn execute(&self, command: &CommandRequest) -> StoreResult<RawReply>;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    async fn incr(&self, key: &str) -> StoreResult<i64>;

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()>;

    async fn flush_db(&self) -> StoreResult<()>;

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    async fn ping(&self) -> StoreResult<()>;
}

pub type SharedStore = Arc<dyn KvStore>;

/// Connects to the store at `addr` using the configured backend and checks
/// it answers a PING before handing it out.
pub async fn connect_store(settings: &Settings, addr: &str) -> StoreResult<SharedStore> {
    let store: SharedStore = match settings.store.backend {
        StoreBackend::Redis => {
            Arc::new(RedisStore::connect(addr, settings.store.timeout()).await?)
        },
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    store.ping().await?;
    tracing::info!(addr = %addr, backend = ?settings.store.backend, "Store connection established");

    Ok(store)
}
