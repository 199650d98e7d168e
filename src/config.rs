use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_STAGE_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_RATE_LIMIT: usize = 60;
const DEFAULT_RATE_WINDOW_SECS: u64 = 60;

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    /// Max pages fetched/processed at once in multi-page commands.
    pub concurrency: usize,
    /// Per-extractor-stage timeout; an elapsed stage yields its default.
    pub stage_timeout: Duration,
    /// Requests allowed per sliding window.
    pub rate_limit: usize,
    pub rate_window: Duration,
    /// Disable the response cache entirely (`CONFLUENCE_CACHE=off`).
    pub cache_enabled: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_url = require("CONFLUENCE_URL")?;
        let username = require("CONFLUENCE_USERNAME")?;
        let api_token = require("CONFLUENCE_API_TOKEN")?;

        Ok(Config {
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            api_token,
            concurrency: parse_var("CONFLUENCE_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            stage_timeout: Duration::from_millis(parse_var(
                "CONFLUENCE_STAGE_TIMEOUT_MS",
                DEFAULT_STAGE_TIMEOUT_MS,
            )?),
            rate_limit: parse_var("CONFLUENCE_RATE_LIMIT", DEFAULT_RATE_LIMIT)?,
            rate_window: Duration::from_secs(parse_var(
                "CONFLUENCE_RATE_WINDOW_SECS",
                DEFAULT_RATE_WINDOW_SECS,
            )?),
            cache_enabled: std::env::var("CONFLUENCE_CACHE")
                .map(|v| v != "off" && v != "0")
                .unwrap_or(true),
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{} environment variable must be set", name)))
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
