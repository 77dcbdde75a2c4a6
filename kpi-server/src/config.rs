//! Server configuration

use std::time::Duration;

use crate::live::LiveConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// HMAC secret for bearer tokens
    pub jwt_secret: String,
    pub log_level: String,
    /// JSON log lines instead of the pretty console format
    pub log_json: bool,
    /// Directory for daily rolling log files; console only when unset
    pub log_dir: Option<String>,
    /// Realtime delivery tuning
    pub live: LiveConfig,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let defaults = LiveConfig::default();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: env_parse("HTTP_PORT").unwrap_or(8080),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            environment,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_parse("LOG_JSON").unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            live: LiveConfig {
                queue_capacity: env_parse("LIVE_QUEUE_CAPACITY")
                    .unwrap_or(defaults.queue_capacity),
                send_timeout: env_secs("LIVE_SEND_TIMEOUT_SECS").unwrap_or(defaults.send_timeout),
                heartbeat_interval: env_secs("LIVE_HEARTBEAT_SECS")
                    .unwrap_or(defaults.heartbeat_interval),
                stale_timeout: env_secs("LIVE_STALE_TIMEOUT_SECS")
                    .unwrap_or(defaults.stale_timeout),
                sweep_interval: env_secs("LIVE_SWEEP_INTERVAL_SECS")
                    .unwrap_or(defaults.sweep_interval),
            },
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<u64>(name)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
