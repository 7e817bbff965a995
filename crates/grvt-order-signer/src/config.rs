/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed signer configuration and the adapter ClientConfig built from it
[POS]:    Configuration layer - file settings under the CLI flags
[UPDATE]: When adding new configuration options
*/

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use grvt_order_adapter::{ClientConfig, Environment, OverflowPolicy};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the order signer
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignerConfig {
    /// Environment name: dev, staging, testnet or prod
    #[serde(default)]
    pub env: Option<String>,
    /// Instrument JSON map; fetched from the exchange when absent
    #[serde(default)]
    pub instruments_file: Option<PathBuf>,
    /// Account used for submission
    #[serde(default)]
    pub account: Option<AccountConfig>,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub stream: StreamSettings,
}

/// Submission account; the API key itself is read from the environment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    pub id: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_margin_secs: default_refresh_margin_secs(),
            refresh_timeout_secs: default_refresh_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StreamSettings {
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
    #[serde(default)]
    pub event_capacity: Option<usize>,
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

fn default_api_key_env() -> String {
    "GRVT_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_refresh_margin_secs() -> u64 {
    60
}

fn default_refresh_timeout_secs() -> u64 {
    10
}

impl SignerConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Environment from the CLI flag, else the file, else prod
    pub fn environment(&self, cli_env: Option<&str>) -> anyhow::Result<Environment> {
        match cli_env.or(self.env.as_deref()) {
            Some(name) => name
                .parse::<Environment>()
                .with_context(|| format!("unknown environment {name:?}")),
            None => Ok(Environment::Prod),
        }
    }

    /// Map the file settings onto the adapter configuration
    pub fn client_config(&self, env: Environment) -> ClientConfig {
        let mut config = ClientConfig::for_env(env);

        config.http.timeout = Duration::from_secs(self.http.timeout_secs);
        config.http.connect_timeout = Duration::from_secs(self.http.connect_timeout_secs);

        config.retry.max_retries = self.retry.max_retries;
        config.retry.initial_delay = Duration::from_millis(self.retry.initial_delay_ms);
        config.retry.max_delay = Duration::from_millis(self.retry.max_delay_ms);

        config.session.refresh_margin = Duration::from_secs(self.session.refresh_margin_secs);
        config.session.refresh_timeout = Duration::from_secs(self.session.refresh_timeout_secs);

        config.stream.max_reconnect_attempts = self.stream.max_reconnect_attempts;
        if let Some(capacity) = self.stream.event_capacity {
            config.stream.event_capacity = capacity;
        }
        config.stream.overflow = self.stream.overflow;

        config
    }
}
