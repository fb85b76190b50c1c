//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (the Telegram bot token) are referenced by env-var name in the
//! config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::engine::monitor::MonitorSettings;
use crate::strategy::trend::TrendConfig;
use crate::types::{PatternSet, SerpentError, BLACK_SNAKE};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub pattern: PatternConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    pub feed_url: String,
    pub tables: Vec<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_empty_backoff")]
    pub empty_backoff_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    #[serde(default = "default_min_history")]
    pub min_history: usize,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Analysed cycles between trend broadcasts; absent disables them.
    #[serde(default)]
    pub trend_broadcast_cycles: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatternConfig {
    #[serde(default = "default_pattern_name")]
    pub name: String,
    #[serde(default = "default_pattern_members")]
    pub members: Vec<u8>,
    #[serde(default = "default_lookback")]
    pub lookback: usize,
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: u32,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            name: default_pattern_name(),
            members: default_pattern_members(),
            lookback: default_lookback(),
            min_occurrences: default_min_occurrences(),
            top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AlertsConfig {
    pub telegram_bot_token_env: Option<String>,
    pub telegram_chat_id_env: Option<String>,
    /// Link attached to entry messages.
    pub table_link: Option<String>,
    /// Override for the Bot API base URL.
    pub telegram_api_base: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_dashboard_port(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2
}
fn default_empty_backoff() -> u64 {
    2
}
fn default_error_backoff() -> u64 {
    5
}
fn default_min_history() -> usize {
    50
}
fn default_history_capacity() -> usize {
    500
}
fn default_request_timeout() -> u64 {
    15
}
fn default_pattern_name() -> String {
    "BLACK SNAKE".to_string()
}
fn default_pattern_members() -> Vec<u8> {
    BLACK_SNAKE.to_vec()
}
fn default_lookback() -> usize {
    3
}
fn default_min_occurrences() -> u32 {
    5
}
fn default_top_n() -> usize {
    10
}
fn default_dashboard_port() -> u16 {
    8080
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the monitors cannot run with.
    pub fn validate(&self) -> Result<(), SerpentError> {
        if self.monitor.tables.is_empty() {
            return Err(SerpentError::Config("monitor.tables is empty".into()));
        }
        if self.monitor.history_capacity == 0 {
            return Err(SerpentError::Config("monitor.history_capacity must be > 0".into()));
        }
        if self.monitor.min_history > self.monitor.history_capacity {
            return Err(SerpentError::Config(format!(
                "monitor.min_history ({}) exceeds history_capacity ({})",
                self.monitor.min_history, self.monitor.history_capacity
            )));
        }
        if self.pattern.lookback == 0 {
            return Err(SerpentError::Config("pattern.lookback must be > 0".into()));
        }
        if self.pattern.top_n == 0 {
            return Err(SerpentError::Config("pattern.top_n must be > 0".into()));
        }
        self.pattern_set()?;
        Ok(())
    }

    pub fn pattern_set(&self) -> Result<PatternSet, SerpentError> {
        PatternSet::new(self.pattern.name.clone(), &self.pattern.members)
    }

    pub fn trend_config(&self) -> TrendConfig {
        TrendConfig {
            lookback: self.pattern.lookback,
            min_occurrences: self.pattern.min_occurrences,
            top_n: self.pattern.top_n,
        }
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_secs(self.monitor.poll_interval_secs),
            empty_backoff: Duration::from_secs(self.monitor.empty_backoff_secs),
            error_backoff: Duration::from_secs(self.monitor.error_backoff_secs),
            min_history: self.monitor.min_history,
            history_capacity: self.monitor.history_capacity,
            trend_broadcast_cycles: self.monitor.trend_broadcast_cycles,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.monitor.request_timeout_secs)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
