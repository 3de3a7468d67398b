use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::{EngineSettings, RetryPolicy, DEFAULT_RESERVATION_WINDOW_SECS};

pub mod cors;

pub use cors::create_cors_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/seckill";
const DEFAULT_SERVER_PORT: u16 = 3001;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_addr: SocketAddr,
    pub cors_allowed_origins: String,
    pub reservation_window_secs: i64,
    /// `0` disables the expiry reaper.
    pub reaper_interval_secs: u64,
    pub reaper_batch_size: u32,
    pub compensation_max_attempts: u32,
    pub compensation_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            server_addr: parse_or("SERVER_ADDR", default_server_addr()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| cors::DEFAULT_ALLOWED_ORIGINS.to_string()),
            reservation_window_secs: parse_or(
                "RESERVATION_WINDOW_SECS",
                DEFAULT_RESERVATION_WINDOW_SECS,
            ),
            reaper_interval_secs: parse_or("REAPER_INTERVAL_SECS", 60),
            reaper_batch_size: parse_or("REAPER_BATCH_SIZE", 100),
            compensation_max_attempts: parse_or("COMPENSATION_MAX_ATTEMPTS", 3),
            compensation_backoff_ms: parse_or("COMPENSATION_BACKOFF_MS", 50),
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            reservation_window: chrono::Duration::seconds(self.reservation_window_secs.max(1)),
            release_retry: RetryPolicy::new(
                self.compensation_max_attempts,
                Duration::from_millis(self.compensation_backoff_ms),
            ),
        }
    }

    pub fn reaper_interval(&self) -> Option<Duration> {
        (self.reaper_interval_secs > 0).then(|| Duration::from_secs(self.reaper_interval_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            database_max_connections: 10,
            server_addr: default_server_addr(),
            cors_allowed_origins: cors::DEFAULT_ALLOWED_ORIGINS.to_string(),
            reservation_window_secs: DEFAULT_RESERVATION_WINDOW_SECS,
            reaper_interval_secs: 60,
            reaper_batch_size: 100,
            compensation_max_attempts: 3,
            compensation_backoff_ms: 50,
        }
    }
}

fn default_server_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_SERVER_PORT))
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Config: invalid value '{}' for {}, using {:?}", raw, key, default);
            default
        }),
        Err(_) => default,
    }
}
