//! Configuration management for Toolbridge
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/toolbridge/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{BridgeError, Result};

/// Main configuration for Toolbridge
///
/// Every section and field is optional in the file; anything left out keeps
/// its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completions endpoint configuration
    pub llm: LlmConfig,
    /// Tool provider configuration
    pub tools: ToolsConfig,
    /// Recap storage configuration
    pub recap: RecapConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Chat-completions endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Full URL of the chat-completions endpoint
    pub endpoint: String,
    /// Model identifier sent with every request
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,
    /// Attempts per chat call
    pub max_attempts: u32,
    /// Fixed wait between attempts in milliseconds
    pub retry_delay_ms: u64,
}

/// Tool provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// JSON file declaring the `mcpServers`, relative to the working directory
    pub config_file: PathBuf,
    /// Attempts per tool invocation
    pub max_attempts: u32,
    /// Wait between tool attempts in milliseconds
    pub retry_delay_ms: u64,
}

/// Recap storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecapConfig {
    /// Directory holding recap files.
    ///
    /// Defaults to `~/.bot1d/storage/short-memory`, the directory the
    /// `save_short_memory` tool provider writes to, so recaps saved by the
    /// model through that tool are offered at startup too.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Ask at startup whether to load the newest recap
    pub offer_on_start: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
    /// Force debug-level output for this crate
    pub debug: bool,
}

/// How often and how patiently a call is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: env::var("TOOLBRIDGE_ENDPOINT").unwrap_or_else(|_| {
                "https://api.groq.com/openai/v1/chat/completions".to_string()
            }),
            model: env::var("TOOLBRIDGE_MODEL").unwrap_or_else(|_| "qwen-qwq-32b".to_string()),
            api_key_env: "LLM_API_KEY".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            config_file: env::var("TOOLBRIDGE_PROVIDERS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("server_config.json")),
            max_attempts: 3,
            retry_delay_ms: 0,
        }
    }
}

impl Default for RecapConfig {
    fn default() -> Self {
        Self {
            directory: None,
            offer_on_start: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: env::var("TOOLBRIDGE_LOG").unwrap_or_else(|_| "info".to_string()),
            debug: env::var("TOOLBRIDGE_DEBUG")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        env::var(&self.api_key_env).map_err(|_| {
            BridgeError::config(format!(
                "Environment variable {} is not set",
                self.api_key_env
            ))
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ToolsConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

impl RecapConfig {
    /// Resolved recap directory
    pub fn directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".bot1d")
                .join("storage")
                .join("short-memory")
        })
    }
}

impl LoggingConfig {
    /// Filter directive handed to the subscriber
    pub fn filter(&self) -> String {
        if self.debug {
            format!("{},toolbridge=debug", self.level)
        } else {
            self.level.clone()
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("toolbridge")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    ///
    /// A missing file means defaults; a file that exists but does not parse
    /// is an error rather than being silently ignored.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::load_from(&Self::config_file())
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            BridgeError::Config(msg) => BridgeError::config(format!("{} ({})", msg, path.display())),
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| BridgeError::config(format!("Failed to parse config: {}", e)))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BridgeError::config(format!("Failed to serialize config: {}", e)))
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file();
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save configuration to a specific file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| BridgeError::config(format!("Failed to create config dir: {}", e)))?;
        }

        fs::write(path, self.to_toml()?)
            .map_err(|e| BridgeError::config(format!("Failed to write config: {}", e)))
    }
}
