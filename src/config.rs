use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Longest session lifetime accepted from `SESSION_DURATION_DAYS`.
pub const MAX_SESSION_DURATION_DAYS: i64 = 365;

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The URL of the PostgreSQL database. Messages and users live in memory when unset.
    pub database_url: Option<String>,
    /// The URL of the Redis server. Sessions live in memory when unset.
    pub redis_url: Option<String>,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// The duration of a session in days.
    pub session_duration_days: i64,
    /// Directory served for any route the API does not handle.
    pub static_dir: PathBuf,
    /// Whether session cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            session_duration_days: 7,
            static_dir: PathBuf::from("public"),
            secure_cookies: false,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(addr) => addr
                .parse()
                .with_context(|| format!("Invalid BIND_ADDR: {}", addr))?,
            Err(_) => defaults.bind_addr,
        };

        let session_duration_days = parse_session_duration(
            &env::var("SESSION_DURATION_DAYS").unwrap_or_else(|_| "7".to_string()),
        )?;

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(origins) => origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => defaults.cors_origins,
        };

        Ok(Self {
            database_url: non_empty_var("DATABASE_URL"),
            redis_url: non_empty_var("REDIS_URL"),
            bind_addr,
            session_duration_days,
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            secure_cookies: env::var("APP_ENV")
                .unwrap_or_else(|_| "development".to_string())
                == "production",
            cors_origins,
        })
    }

    /// Session lifetime in seconds.
    pub fn session_ttl_secs(&self) -> u64 {
        (self.session_duration_days * 86400) as u64
    }
}

fn parse_session_duration(raw: &str) -> Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Invalid SESSION_DURATION_DAYS: {}", raw))?;

    if days <= 0 {
        anyhow::bail!("SESSION_DURATION_DAYS must be a positive number of days");
    }
    if days > MAX_SESSION_DURATION_DAYS {
        anyhow::bail!(
            "SESSION_DURATION_DAYS must be at most {} days",
            MAX_SESSION_DURATION_DAYS
        );
    }

    Ok(days)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
