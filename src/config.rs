// src/config.rs
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ReviveError;
use crate::registry::DEFAULT_RUN_RETENTION;
use crate::services::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Timing of the progress animation and the demo path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerConfig {
    pub total: Duration,
    pub interval: Duration,
    /// Highest percentage shown before the request has settled.
    pub soft_cap: u8,
    /// Pause after reaching 100% before the outcome is delivered.
    pub grace: Duration,
    pub demo_delay: Duration,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            total: Duration::from_millis(4000),
            interval: Duration::from_millis(40),
            soft_cap: 90,
            grace: Duration::from_millis(500),
            demo_delay: Duration::from_millis(3000),
        }
    }
}

impl TickerConfig {
    /// Tick period, never shorter than 1ms.
    pub fn period(&self) -> Duration {
        self.interval.max(Duration::from_millis(1))
    }

    pub fn steps(&self) -> u32 {
        ((self.total.as_millis() / self.period().as_millis()) as u32).max(1)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub template_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
    /// How long a finished run stays readable before it is dropped.
    pub run_retention: Duration,
    pub ticker: TickerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            template_path: None,
            max_upload_bytes: 20 * 1024 * 1024,
            run_retention: DEFAULT_RUN_RETENTION,
            ticker: TickerConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ReviveError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ReviveError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_upload_bytes = match non_empty("PHOTOREVIVE_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                ReviveError::Config(format!("PHOTOREVIVE_MAX_UPLOAD_BYTES={}: {}", raw, e))
            })?,
            None => defaults.max_upload_bytes,
        };

        let run_retention = match non_empty("PHOTOREVIVE_RUN_RETENTION_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
                ReviveError::Config(format!("PHOTOREVIVE_RUN_RETENTION_SECS={}: {}", raw, e))
            })?,
            None => defaults.run_retention,
        };

        Ok(Self {
            bind_addr: non_empty("PHOTOREVIVE_BIND").unwrap_or(defaults.bind_addr),
            api_key: non_empty("GEMINI_API_KEY"),
            model: non_empty("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: non_empty("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            template_path: non_empty("PHOTOREVIVE_TEMPLATE").map(PathBuf::from),
            max_upload_bytes,
            run_retention,
            ticker: defaults.ticker,
        })
    }
}
