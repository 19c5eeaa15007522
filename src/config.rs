// src/config.rs
use anyhow::{anyhow, Context, Result};
use std::str::FromStr;

use crate::notify::webhook::DEFAULT_BASE_URL;

/// Log verbosity requested by deployment config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Normal,
    Debug,
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(LogLevel::Normal),
            "debug" => Ok(LogLevel::Debug),
            other => Err(anyhow!("LOG_LEVEL must be normal|debug, got {other:?}")),
        }
    }
}

impl LogLevel {
    pub fn env_filter(self) -> &'static str {
        match self {
            LogLevel::Normal => "feed_crossposter=info,warn",
            LogLevel::Debug => "feed_crossposter=debug,info",
        }
    }
}

/// Everything the service needs, read once at startup and passed down
/// explicitly. Missing required values are a fatal configuration error.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub feed_url: String,
    pub checkpoint_endpoint: String,
    pub checkpoint_table: String,
    pub webhook_base_url: String,
    pub webhook_key: String,
    pub webhook_event_default: String,
    pub webhook_event_media: String,
    pub max_items_per_run: usize,
    pub log_level: LogLevel,
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow!("missing required env var {name}"))
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let max_items_per_run = require("MAX_ITEMS_PER_RUN")?
            .parse::<usize>()
            .context("MAX_ITEMS_PER_RUN must be an integer")?;
        let log_level = require("LOG_LEVEL")?.parse::<LogLevel>()?;

        Ok(Self {
            feed_url: require("FEED_URL")?,
            checkpoint_endpoint: require("CHECKPOINT_ENDPOINT")?,
            checkpoint_table: require("CHECKPOINT_TABLE")?,
            webhook_base_url: std::env::var("WEBHOOK_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            webhook_key: require("WEBHOOK_KEY")?,
            webhook_event_default: require("WEBHOOK_EVENT_DEFAULT")?,
            webhook_event_media: require("WEBHOOK_EVENT_MEDIA")?,
            max_items_per_run,
            log_level,
        })
    }
}
