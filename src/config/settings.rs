use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown store backend '{0}', expected 'redis' or 'memory'")]
    UnknownStoreBackend(String),

    #[error("Unknown cleanup header mode '{0}', expected 'next' or 'last'")]
    UnknownHeaderMode(String),

    #[error("{0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub cleanup: CleanupSettings,
    #[serde(default)]
    pub commands: CommandSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub cors: CorsSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" | "dicedb" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownStoreBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    /// Instance users play with; flushed by the cleanup job
    #[serde(default = "default_demo_addr")]
    pub demo_addr: String,
    /// Instance holding rate-limit counters and cleanup bookkeeping
    #[serde(default = "default_admin_addr")]
    pub admin_addr: String,
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_request_limit")]
    pub limit: i64,
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
}

/// Which cleanup timestamp the rate-limit headers report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupHeaderMode {
    /// `x-next-cleanup-time`: seconds until the next cleanup
    Next,
    /// `x-last-cleanup-time`: unix milliseconds of the last cleanup
    Last,
}

impl FromStr for CleanupHeaderMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next" => Ok(Self::Next),
            "last" => Ok(Self::Last),
            other => Err(ConfigError::UnknownHeaderMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSettings {
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cleanup_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_cleanup_namespace")]
    pub namespace: String,
    #[serde(default = "default_cleanup_header_mode")]
    pub header_mode: CleanupHeaderMode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSettings {
    #[serde(default = "default_blocklist_enabled")]
    pub blocklist_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: StringOrVec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringOrVec(pub Vec<String>);

impl StringOrVec {
    fn from_comma_separated(s: &str) -> Self {
        StringOrVec(
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl<'de> serde::Deserialize<'de> for StringOrVec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct StringOrVecVisitor;

        impl<'de> Visitor<'de> for StringOrVecVisitor {
            type Value = StringOrVec;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or array of strings")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(StringOrVec::from_comma_separated(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(s) = seq.next_element::<String>()? {
                    vec.push(s);
                }
                Ok(StringOrVec(vec))
            }
        }

        deserializer.deserialize_any(StringOrVecVisitor)
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_store_backend() -> StoreBackend {
    StoreBackend::Redis
}
fn default_demo_addr() -> String {
    "localhost:7379".to_string()
}
fn default_admin_addr() -> String {
    "localhost:7380".to_string()
}
fn default_store_timeout_ms() -> u64 {
    5000
}
fn default_request_limit() -> i64 {
    1000
}
fn default_window_secs() -> i64 {
    60
}
fn default_cleanup_enabled() -> bool {
    true
}
fn default_cleanup_interval_secs() -> u64 {
    900
}
fn default_cleanup_namespace() -> String {
    "playground_mono".to_string()
}
fn default_cleanup_header_mode() -> CleanupHeaderMode {
    CleanupHeaderMode::Next
}
fn default_blocklist_enabled() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_allowed_origins() -> StringOrVec {
    StringOrVec(vec!["*".to_string(), "http://localhost:3000".to_string()])
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            demo_addr: default_demo_addr(),
            admin_addr: default_admin_addr(),
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            limit: default_request_limit(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            enabled: default_cleanup_enabled(),
            interval_secs: default_cleanup_interval_secs(),
            namespace: default_cleanup_namespace(),
            header_mode: default_cleanup_header_mode(),
        }
    }
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            blocklist_enabled: default_blocklist_enabled(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Settings {
            server: ServerSettings {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| default_host()),
                port: env_parse("SERVER_PORT").unwrap_or_else(default_port),
                request_timeout_secs: env_parse("SERVER_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(default_request_timeout_secs),
            },
            store: StoreSettings {
                backend: match std::env::var("STORE_BACKEND") {
                    Ok(s) => s.parse()?,
                    Err(_) => default_store_backend(),
                },
                demo_addr: std::env::var("DICEDB_ADDR").unwrap_or_else(|_| default_demo_addr()),
                admin_addr: std::env::var("DICEDB_ADMIN_ADDR")
                    .unwrap_or_else(|_| default_admin_addr()),
                timeout_ms: env_parse("STORE_TIMEOUT_MS").unwrap_or_else(default_store_timeout_ms),
            },
            rate_limit: RateLimitSettings {
                limit: env_parse("REQUEST_LIMIT_PER_WINDOW").unwrap_or_else(default_request_limit),
                window_secs: env_parse("REQUEST_WINDOW_SECS").unwrap_or_else(default_window_secs),
            },
            cleanup: CleanupSettings {
                enabled: env_bool("CLEANUP_ENABLED").unwrap_or_else(default_cleanup_enabled),
                interval_secs: env_parse("CLEANUP_INTERVAL_SECS")
                    .unwrap_or_else(default_cleanup_interval_secs),
                namespace: std::env::var("CLEANUP_NAMESPACE")
                    .unwrap_or_else(|_| default_cleanup_namespace()),
                header_mode: match std::env::var("CLEANUP_HEADER_MODE") {
                    Ok(s) => s.parse()?,
                    Err(_) => default_cleanup_header_mode(),
                },
            },
            commands: CommandSettings {
                blocklist_enabled: env_bool("BLOCKLIST_ENABLED")
                    .unwrap_or_else(default_blocklist_enabled),
            },
            logging: LoggingSettings {
                level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| default_log_level()),
                format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| default_log_format()),
            },
            cors: CorsSettings {
                allowed_origins: std::env::var("ALLOWED_ORIGINS")
                    .map(|s| StringOrVec::from_comma_separated(&s))
                    .unwrap_or_else(|_| default_allowed_origins()),
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.limit <= 0 {
            return Err(ConfigError::Invalid("Request limit per window must be greater than zero"));
        }

        if self.rate_limit.window_secs < 1 {
            return Err(ConfigError::Invalid("Request window must be at least one second"));
        }

        if self.cleanup.interval_secs < 1 {
            return Err(ConfigError::Invalid("Cleanup interval must be at least one second"));
        }

        if self.store.timeout_ms == 0 {
            return Err(ConfigError::Invalid("Store timeout must be greater than zero"));
        }

        if self.cors.allowed_origins.0.is_empty() {
            return Err(ConfigError::Invalid("At least one allowed origin must be configured"));
        }

        Ok(())
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CleanupSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn last_cleanup_key(&self) -> String {
        format!("{}:last_cron_cleanup_run_time_unix_ms", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rate_limit.limit, 1000);
        assert_eq!(settings.rate_limit.window_secs, 60);
        assert_eq!(settings.store.timeout(), Duration::from_secs(5));
        assert_eq!(
            settings.cleanup.last_cleanup_key(),
            "playground_mono:last_cron_cleanup_run_time_unix_ms"
        );
    }

    #[test]
    fn rejects_zero_limit_and_window() {
        let mut settings = Settings::default();
        settings.rate_limit.limit = 0;
        assert_eq!(
            settings.validate().unwrap_err().to_string(),
            "Request limit per window must be greater than zero"
        );

        let mut settings = Settings::default();
        settings.rate_limit.window_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn parses_enum_settings() {
        assert_eq!("Memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("dicedb".parse::<StoreBackend>().unwrap(), StoreBackend::Redis);
        assert!(matches!(
            "etcd".parse::<StoreBackend>(),
            Err(ConfigError::UnknownStoreBackend(ref name)) if name == "etcd"
        ));
        assert!(matches!(
            "first".parse::<CleanupHeaderMode>(),
            Err(ConfigError::UnknownHeaderMode(_))
        ));
        assert_eq!(
            "last".parse::<CleanupHeaderMode>().unwrap(),
            CleanupHeaderMode::Last
        );
    }

    #[test]
    fn origins_deserialize_from_string_or_list() {
        let from_string: StringOrVec =
            serde_json::from_str(r#""*, http://localhost:3000""#).unwrap();
        assert_eq!(from_string.0, vec!["*", "http://localhost:3000"]);

        let from_list: StringOrVec = serde_json::from_str(r#"["https://a.dev"]"#).unwrap();
        assert_eq!(from_list.0, vec!["https://a.dev"]);
    }
}
