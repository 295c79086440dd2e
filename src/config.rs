//! Environment-driven configuration.

use std::time::Duration;

use thiserror::Error;

use crate::context::Locals;
use crate::loaders::CacheHeaderStyle;
use crate::upstream::StatusPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Settings for the page server and its loaders.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the page server binds to.
    pub bind_addr: String,
    /// Injected into every page request.
    pub locals: Locals,
    pub status_policy: StatusPolicy,
    pub cache_header_style: CacheHeaderStyle,
    /// Lifetime of the cached leaderboard; `None` keeps it until restart.
    pub leaderboard_ttl: Option<Duration>,
}

impl Config {
    /// Loads `.env` if present, then reads:
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `API_URL`, `API_KEY`, `FASTIFY_URL` | required |
    /// | `BIND_ADDR` | `127.0.0.1:3000` |
    /// | `UPSTREAM_STATUS_POLICY` | `passthrough` |
    /// | `CACHE_HEADER_STYLE` | `verbatim` |
    /// | `LEADERBOARD_CACHE_TTL_SECS` | `300` (`0` = never expire) |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any name → value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let locals = Locals {
            api_url: trim_base(required("API_URL")?),
            api_key: required("API_KEY")?,
            fastify_url: trim_base(required("FASTIFY_URL")?),
            user: None,
        };

        let status_policy = parse_or(&lookup, "UPSTREAM_STATUS_POLICY", StatusPolicy::default())?;
        let cache_header_style =
            parse_or(&lookup, "CACHE_HEADER_STYLE", CacheHeaderStyle::default())?;
        let ttl_secs: u64 = parse_or(&lookup, "LEADERBOARD_CACHE_TTL_SECS", 300)?;

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_owned()),
            locals,
            status_policy,
            cache_header_style,
            leaderboard_ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
        })
    }
}

// Endpoints are appended as `/path`, so a trailing slash would double up.
fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_owned()
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
