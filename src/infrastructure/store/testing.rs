use std::time::Duration;

use async_trait::async_trait;

use super::{KvStore, StoreError, StoreResult};
use crate::domain::models::{CommandRequest, RawReply};

/// Store double whose every call fails as if the server were down.
pub struct UnreachableStore;

fn refused<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl KvStore for UnreachableStore {
    async fn execute(&self, _command: &CommandRequest) -> StoreResult<RawReply> {
        refused()
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        refused()
    }

    async fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        refused()
    }

    async fn incr(&self, _key: &str) -> StoreResult<i64> {
        refused()
    }

    async fn expire(&self, _key: &str, _ttl: Duration) -> StoreResult<()> {
        refused()
    }

    async fn flush_db(&self) -> StoreResult<()> {
        refused()
    }

    async fn keys(&self, _pattern: &str) -> StoreResult<Vec<String>> {
        refused()
    }

    async fn ping(&self) -> StoreResult<()> {
        refused()
    }
}
