use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{KvStore, StoreError, StoreResult};
use crate::domain::models::{CommandRequest, RawReply};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process string store with per-key expiry.
///
/// Used for local development without a store server and as the store
/// behind the gateway's tests. Expired keys are dropped lazily on access.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time to live of `key`, if it exists and has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.live(key)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    fn live(&self, key: &str) -> Option<Entry> {
        let now = Instant::now();
        let entry = self.entries.get(key)?.clone();
        if entry.is_expired(now) {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        Some(entry)
    }

    fn set_value(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), Entry::new(value));
    }

    /// Atomic per key: the entry stays locked between read and write.
    fn incr_by(&self, key: &str, delta: i64) -> StoreResult<i64> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new("0".to_string()));

        if entry.is_expired(now) {
            *entry = Entry::new("0".to_string());
        }

        let current: i64 = entry.value.parse().map_err(|_| {
            StoreError::Command("ERR value is not an integer or out of range".to_string())
        })?;
        let next = current.checked_add(delta).ok_or_else(|| {
            StoreError::Command("ERR increment or decrement would overflow".to_string())
        })?;

        entry.value = next.to_string();
        Ok(next)
    }

    fn set_expiry(&self, key: &str, ttl: Duration) -> bool {
        if self.live(key).is_none() {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                true
            },
            None => false,
        }
    }

    fn matching_keys(&self, pattern: &str) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !e.value().is_expired(now) && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    fn dispatch(&self, name: &str, args: &[String]) -> StoreResult<RawReply> {
        let arity = |expected: usize| -> StoreResult<()> {
            if args.len() == expected {
                Ok(())
            } else {
                Err(wrong_arity(name))
            }
        };

        match name {
            "PING" => match args {
                [] => Ok(RawReply::text("PONG")),
                [message] => Ok(RawReply::text(message.as_str())),
                _ => Err(wrong_arity(name)),
            },
            "ECHO" => {
                arity(1)?;
                Ok(RawReply::text(args[0].as_str()))
            },
            "GET" => {
                arity(1)?;
                Ok(self
                    .live(&args[0])
                    .map(|e| RawReply::Text(e.value))
                    .unwrap_or(RawReply::Nil))
            },
            "SET" => {
                arity(2)?;
                self.set_value(&args[0], args[1].clone());
                Ok(RawReply::text("OK"))
            },
            "DEL" | "EXISTS" => {
                if args.is_empty() {
                    return Err(wrong_arity(name));
                }
                let count = args
                    .iter()
                    .filter(|key| {
                        if name == "DEL" {
                            self.live(key).is_some() && self.entries.remove(key.as_str()).is_some()
                        } else {
                            self.live(key).is_some()
                        }
                    })
                    .count();
                Ok(RawReply::Integer(count as i64))
            },
            "INCR" => {
                arity(1)?;
                self.incr_by(&args[0], 1).map(RawReply::Integer)
            },
            "DECR" => {
                arity(1)?;
                self.incr_by(&args[0], -1).map(RawReply::Integer)
            },
            "EXPIRE" => {
                arity(2)?;
                let seconds: u64 = args[1].parse().map_err(|_| {
                    StoreError::Command("ERR value is not an integer or out of range".to_string())
                })?;
                let applied = self.set_expiry(&args[0], Duration::from_secs(seconds));
                Ok(RawReply::Integer(i64::from(applied)))
            },
            "TTL" => {
                arity(1)?;
                let ttl = match self.live(&args[0]) {
                    None => -2,
                    Some(Entry {
                        expires_at: None, ..
                    }) => -1,
                    Some(_) => self
                        .ttl(&args[0])
                        .map(|d| d.as_secs_f64().ceil() as i64)
                        .unwrap_or(-2),
                };
                Ok(RawReply::Integer(ttl))
            },
            "KEYS" => {
                arity(1)?;
                Ok(RawReply::from(self.matching_keys(&args[0])))
            },
            "DBSIZE" => {
                arity(0)?;
                Ok(RawReply::Integer(self.matching_keys("*").len() as i64))
            },
            "FLUSHDB" => {
                arity(0)?;
                self.entries.clear();
                Ok(RawReply::text("OK"))
            },
            _ => Err(StoreError::Command(format!(
                "ERR unknown command '{}'",
                name.to_ascii_lowercase()
            ))),
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn execute(&self, command: &CommandRequest) -> StoreResult<RawReply> {
        self.dispatch(&command.name.to_ascii_uppercase(), &command.args)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.live(key).map(|e| e.value))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_value(key, value.to_string());
        Ok(())
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.incr_by(key, 1)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        self.set_expiry(key, ttl);
        Ok(())
    }

    async fn flush_db(&self) -> StoreResult<()> {
        self.entries.clear();
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        Ok(self.matching_keys(pattern))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn wrong_arity(name: &str) -> StoreError {
    StoreError::Command(format!(
        "ERR wrong number of arguments for '{}' command",
        name.to_ascii_lowercase()
    ))
}

/// `*` and `?` glob matching as used by KEYS.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            },
            Some('?') => {
                p += 1;
                t += 1;
            },
            Some(c) if *c == text[t] => {
                p += 1;
                t += 1;
            },
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                },
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}
