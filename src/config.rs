use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub intent: EndpointConfig,
    pub balance: EndpointConfig,
    #[serde(default)]
    pub funding: FundingConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
}

/// HTTP endpoint of an external collaborator
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointConfig {
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Funding wait cadence and bound
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FundingConfig {
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_wait_secs: 600,
        }
    }
}

impl FundingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrchestratorConfig {
    /// Re-submissions allowed after funds arrive
    pub max_auto_retries: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_auto_retries: 1,
        }
    }
}

/// Ticker allow-list for message scanning, in priority order
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenConfig {
    pub known: Vec<String>,
    pub native: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            known: ["TON", "USDT", "USDC", "NOT", "ETH", "BTC"]
                .into_iter()
                .map(String::from)
                .collect(),
            native: "TON".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(&format!("config/{}.yaml", env))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.funding.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "funding.poll_interval_ms must be > 0".into(),
            ));
        }
        if self.funding.max_wait_secs == 0 {
            return Err(ConfigError::Invalid(
                "funding.max_wait_secs must be > 0".into(),
            ));
        }
        if self.tokens.native.trim().is_empty() {
            return Err(ConfigError::Invalid("tokens.native must not be empty".into()));
        }
        Ok(())
    }
}
