//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use condense_orchestrator::{CompactionConfig, ReentrancyPolicy};
use condense_types::BackendClient;

/// Configuration for condense
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the context-management backend
    pub backend_url: Option<String>,
    /// Shared secret sent as `X-Secret-Key`
    pub secret_key: Option<String>,
    /// Compaction settings
    pub compaction: Option<CompactionSettings>,
}

/// Compaction settings from the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionSettings {
    /// Delay before the continuation message is submitted
    pub continuation_delay_ms: Option<u64>,
    /// Let overlapping compactions run instead of rejecting them
    pub allow_concurrent: Option<bool>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("condense")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("CONDENSE_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Parse config from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            backend_url: Some("http://127.0.0.1:3000".to_string()),
            secret_key: None,
            compaction: Some(CompactionSettings {
                continuation_delay_ms: Some(100),
                allow_concurrent: Some(false),
            }),
        };

        default_config.save()?;
        Ok(path)
    }

    /// Backend client for `url_override`, else the configured URL, else the
    /// environment. A configured secret key wins over the environment's.
    pub fn backend_client(
        &self,
        url_override: Option<String>,
    ) -> condense_types::Result<BackendClient> {
        let client = match url_override.or_else(|| self.backend_url.clone()) {
            Some(url) => {
                let client = BackendClient::new(url);
                match std::env::var("CONDENSE_SECRET_KEY") {
                    Ok(key) => client.with_secret_key(key),
                    Err(_) => client,
                }
            }
            None => BackendClient::from_env()?,
        };

        Ok(match self.secret_key {
            Some(ref key) => client.with_secret_key(key.clone()),
            None => client,
        })
    }

    /// Orchestrator configuration from these settings
    pub fn compaction_config(&self) -> CompactionConfig {
        let mut config = CompactionConfig::default();
        if let Some(ref settings) = self.compaction {
            if let Some(ms) = settings.continuation_delay_ms {
                config.continuation_delay = Duration::from_millis(ms);
            }
            if settings.allow_concurrent.unwrap_or(false) {
                config.reentrancy = ReentrancyPolicy::Allow;
            }
        }
        config
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# condense configuration file
# Place at ~/.config/condense/config.toml (Linux) or set CONDENSE_CONFIG_PATH

# Context-management backend (can also use CONDENSE_BACKEND_URL)
backend_url = "http://127.0.0.1:3000"

# Shared secret sent as X-Secret-Key (can also use CONDENSE_SECRET_KEY)
# secret_key = "..."

[compaction]
# Milliseconds to wait before submitting the continuation message
continuation_delay_ms = 100

# Let a second compaction start while one is running (false rejects it)
allow_concurrent = false
"#
}
