//! Runtime configuration, read from the environment (and `.env` when
//! present).
//!
//! | Variable                     | Required | Default | Description                        |
//! |------------------------------|----------|---------|------------------------------------|
//! | `PG_SCOUT_API_BASE_URL`      | yes      | --      | Base URL of the housing REST API   |
//! | `PG_SCOUT_MAPS_API_KEY`      | no       | --      | Maps provider key                  |
//! | `PG_SCOUT_HTTP_TIMEOUT_SECS` | no       | `30`    | Per-request timeout                |
//! | `PG_SCOUT_SESSION_FILE`      | no       | --      | JSON file the session persists to  |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub maps_api_key: Option<String>,
    pub timeout: Duration,
    pub session_file: Option<PathBuf>,
}

impl Config {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            maps_api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            session_file: None,
        }
    }

    /// Load from the process environment. `base_url_override` wins over
    /// `PG_SCOUT_API_BASE_URL` when given.
    pub fn from_env(base_url_override: Option<String>) -> Result<Self> {
        Self::from_lookup(base_url_override, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(base_url_override: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = base_url_override
            .or_else(|| lookup("PG_SCOUT_API_BASE_URL"))
            .filter(|url| !url.trim().is_empty())
            .context("PG_SCOUT_API_BASE_URL must be set (or pass --api-base-url)")?;

        let timeout_secs = match lookup("PG_SCOUT_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("PG_SCOUT_HTTP_TIMEOUT_SECS is not a number: {raw}"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
            maps_api_key: lookup("PG_SCOUT_MAPS_API_KEY").filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            session_file: lookup("PG_SCOUT_SESSION_FILE").map(PathBuf::from),
        })
    }
}
