use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{RedisError, RedisResult, Value};

use super::{KvStore, StoreError, StoreResult};
use crate::domain::models::{CommandRequest, RawReply};

/// RESP store client; every call is bounded by `timeout`.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    pub async fn connect(addr: &str, timeout: Duration) -> StoreResult<Self> {
        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("redis://{}", addr)
        };

        let client = redis::Client::open(url.as_str())
            .map_err(|e| StoreError::Unavailable(format!("invalid store address {}: {}", addr, e)))?;

        let conn = tokio::time::timeout(Duration::from_secs(10), ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Unavailable(format!("connection to {} timed out", addr)))?
            .map_err(StoreError::from)?;

        Ok(Self { conn, timeout })
    }

    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        with_timeout(self.timeout, fut).await
    }
}

/// Runs one store call, giving up after `limit`.
async fn with_timeout<T, F>(limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = RedisResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn execute(&self, command: &CommandRequest) -> StoreResult<RawReply> {
        let mut cmd = redis::cmd(&command.name);
        for arg in &command.args {
            cmd.arg(arg);
        }

        let mut conn = self.conn.clone();
        let value: Value = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(raw_reply(value))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = self
            .bounded(redis::cmd("GET").arg(key).query_async(&mut conn))
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded(redis::cmd("SET").arg(key).arg(value).query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let count: i64 = self
            .bounded(redis::cmd("INCR").arg(key).query_async(&mut conn))
            .await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .bounded(
                redis::cmd("EXPIRE")
                    .arg(key)
                    .arg(ttl.as_secs().max(1))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(())
    }

    async fn flush_db(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded(redis::cmd("FLUSHDB").query_async(&mut conn))
            .await?;
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = self
            .bounded(redis::cmd("KEYS").arg(pattern).query_async(&mut conn))
            .await?;
        Ok(keys)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = self
            .bounded(redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error()
            || err.is_timeout()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
        {
            return StoreError::Unavailable(err.to_string());
        }

        match (err.code(), err.detail()) {
            (Some(code), Some(detail)) => StoreError::Command(format!("{} {}", code, detail)),
            (Some(code), None) => StoreError::Command(code.to_string()),
            _ => StoreError::Protocol(err.to_string()),
        }
    }
}

fn raw_reply(value: Value) -> RawReply {
    match value {
        Value::Nil => RawReply::Nil,
        Value::Int(n) => RawReply::Integer(n),
        Value::BulkString(bytes) => match String::from_utf8(bytes) {
            Ok(s) => RawReply::Text(s),
            Err(e) => RawReply::Bytes(e.into_bytes()),
        },
        Value::SimpleString(s) => RawReply::Text(s),
        Value::Okay => RawReply::text("OK"),
        Value::Array(items) | Value::Set(items) => {
            RawReply::Sequence(items.into_iter().map(raw_reply).collect())
        },
        Value::Map(pairs) => RawReply::Sequence(
            pairs
                .into_iter()
                .flat_map(|(k, v)| [raw_reply(k), raw_reply(v)])
                .collect(),
        ),
        Value::Double(d) => RawReply::Text(d.to_string()),
        Value::Boolean(b) => RawReply::Text(b.to_string()),
        other => RawReply::Text(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn stalled_call_times_out_as_unavailable() {
        let limit = Duration::from_millis(20);
        let err = with_timeout(limit, std::future::pending::<RedisResult<()>>())
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::Timeout(limit));
        assert!(err.is_unavailable());
        assert_eq!(
            AppError::from(err).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn completed_call_passes_through() {
        let value = with_timeout(Duration::from_secs(1), async { Ok::<_, RedisError>(7_i64) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(RedisError::from((
                redis::ErrorKind::ResponseError,
                "WRONGTYPE",
                "Operation against a key holding the wrong kind of value".to_string(),
            )))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::Command(_)));
    }

    #[test]
    fn converts_resp_values() {
        assert_eq!(raw_reply(Value::Nil), RawReply::Nil);
        assert_eq!(raw_reply(Value::Int(7)), RawReply::Integer(7));
        assert_eq!(raw_reply(Value::Okay), RawReply::text("OK"));
        assert_eq!(
            raw_reply(Value::BulkString(b"v".to_vec())),
            RawReply::text("v")
        );
        assert_eq!(
            raw_reply(Value::BulkString(vec![0xff, 0xfe])),
            RawReply::Bytes(vec![0xff, 0xfe])
        );
    }

    #[test]
    fn flattens_maps_into_pairs() {
        let map = Value::Map(vec![
            (Value::BulkString(b"f1".to_vec()), Value::BulkString(b"v1".to_vec())),
            (Value::BulkString(b"f2".to_vec()), Value::Int(2)),
        ]);
        assert_eq!(
            raw_reply(map),
            RawReply::Sequence(vec![
                RawReply::text("f1"),
                RawReply::text("v1"),
                RawReply::text("f2"),
                RawReply::Integer(2),
            ])
        );
    }
}
