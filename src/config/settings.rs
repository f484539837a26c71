//! Runtime settings loaded from environment variables.
//!
//! `.env` is loaded by `main` before [`Settings::from_env`] runs, so every key
//! below can live either in the process environment or in `.env`.

use crate::errors::{Error, Result};
use std::{env, fmt::Display, str::FromStr, time::Duration};
use tracing::{info, warn};

/// Deployment environment, from `NODE_ENV` (or its alias `APP_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Local development; error messages are returned verbatim
    Development,
    /// Production; internal error messages are redacted
    Production,
}

impl Environment {
    /// `NODE_ENV` wins over `APP_ENV`; neither set means development.
    fn resolve(node_env: Option<&str>, app_env: Option<&str>) -> Self {
        node_env.or(app_env).map_or(Self::Development, Self::parse)
    }

    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }
}

/// Eviction policy for the classification cache, from `CLASSIFY_CACHE_POLICY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicySetting {
    /// Evict the least recently used entry when full
    Lru,
    /// Clear everything once the capacity is exceeded
    ClearAll,
}

impl FromStr for CachePolicySetting {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "clear" | "clear_all" => Ok(Self::ClearAll),
            other => Err(format!("unknown cache policy '{other}'")),
        }
    }
}

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `DATABASE_URL`
    pub database_url: String,
    /// `BIND_ADDRESS`
    pub bind_address: String,
    /// `NODE_ENV`, falling back to `APP_ENV`
    pub environment: Environment,
    /// `ALLOWED_ORIGINS`, comma separated; used outside production
    pub allowed_origins: Vec<String>,
    /// `PRODUCTION_ORIGINS`, comma separated; used in production
    pub production_origins: Vec<String>,
    /// `DEEPSEEK_API_KEY`; AI features degrade gracefully without it
    pub deepseek_api_key: Option<String>,
    /// `DEEPSEEK_BASE_URL`
    pub deepseek_base_url: String,
    /// `DEEPSEEK_MODEL`
    pub deepseek_model: String,
    /// `TESSERACT_BIN`
    pub tesseract_bin: String,
    /// `CLASSIFY_CACHE_CAPACITY`
    pub cache_capacity: usize,
    /// `CLASSIFY_CACHE_TTL_SECS`; 0 disables expiry
    pub cache_ttl: Option<Duration>,
    /// `CLASSIFY_CACHE_POLICY`
    pub cache_policy: CachePolicySetting,
    /// `CATALOG_PATH`
    pub catalog_path: String,
}

impl Settings {
    /// Reads all settings from the environment, falling back to defaults.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a numeric or enumerated value does not parse.
    pub fn from_env() -> Result<Self> {
        let ttl_secs: u64 = parse_or("CLASSIFY_CACHE_TTL_SECS", 3600)?;

        Ok(Self {
            database_url: super::database::get_database_url(),
            bind_address: string_or("BIND_ADDRESS", "0.0.0.0:3000"),
            environment: Environment::resolve(
                env::var("NODE_ENV").ok().as_deref(),
                env::var("APP_ENV").ok().as_deref(),
            ),
            allowed_origins: list("ALLOWED_ORIGINS"),
            production_origins: list("PRODUCTION_ORIGINS"),
            deepseek_api_key: env::var("DEEPSEEK_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            deepseek_base_url: string_or("DEEPSEEK_BASE_URL", "https://api.deepseek.com"),
            deepseek_model: string_or("DEEPSEEK_MODEL", "deepseek-chat"),
            tesseract_bin: string_or("TESSERACT_BIN", "tesseract"),
            cache_capacity: parse_or("CLASSIFY_CACHE_CAPACITY", 200)?,
            cache_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            cache_policy: parse_or("CLASSIFY_CACHE_POLICY", CachePolicySetting::Lru)?,
            catalog_path: string_or("CATALOG_PATH", "config.toml"),
        })
    }

    /// Origins the CORS layer should accept for the current environment.
    #[must_use]
    pub fn cors_origins(&self) -> &[String] {
        match self.environment {
            Environment::Production => &self.production_origins,
            Environment::Development => &self.allowed_origins,
        }
    }

    /// Whether 500 responses must hide their message.
    #[must_use]
    pub fn redact_internal_errors(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn string_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e| {
            warn!("Invalid {key} value: {e}");
            Error::Config {
                message: format!("Invalid {key} value '{raw}': {e}"),
            }
        }),
        Err(_) => Ok(default),
    }
}

fn list(key: &str) -> Vec<String> {
    env::var(key).map_or_else(|_| Vec::new(), |raw| split_list(&raw))
}

/// Splits a comma-separated list, dropping blanks.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
