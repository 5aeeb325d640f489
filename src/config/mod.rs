// Configuration module
//
// The configuration is loaded once at startup, frozen behind an `Arc` and
// handed to the proxy explicitly. Nothing reads the environment per request.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::access::parse_allow_list;
use crate::constants::{ALLOW_LIST_ENV, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REDIRECT_URL};
use crate::engine::ImageLimits;

pub mod server;

pub use server::ServerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Target of the 302 sent when a request carries no `url`
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Bounds on source and resize target dimensions
    #[serde(default)]
    pub limits: ImageLimits,
}

fn default_redirect_url() -> String {
    DEFAULT_REDIRECT_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            access: AccessConfig::default(),
            fetch: FetchConfig::default(),
            redirect_url: default_redirect_url(),
            logging: LoggingConfig::default(),
            limits: ImageLimits::default(),
        }
    }
}

/// Host allow-list for source and overlay images
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AccessConfig {
    /// Permitted host suffixes. Empty means every host is allowed.
    #[serde(default)]
    pub allow_list: Vec<String>,
}

fn default_fetch_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("edgepix/{}", env!("CARGO_PKG_VERSION"))
}

/// Outbound fetch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchConfig {
    /// Timeout for a single upstream fetch in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    /// User-Agent sent when the client did not supply one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        let mut missing = None;
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            })
        });

        if let Some(var_name) = missing {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        // An empty document deserializes to unit; treat it as all defaults
        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Load from `path` when given, defaults otherwise, then apply
    /// environment overrides and validate.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_allow_list_override(std::env::var(ALLOW_LIST_ENV).ok());
    }

    /// Replace the allow-list with a comma-separated override, if present.
    pub fn apply_allow_list_override(&mut self, value: Option<String>) {
        if let Some(value) = value {
            self.access.allow_list = parse_allow_list(&value);
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }
        if self.server.threads == 0 {
            return Err("server.threads must be at least 1".to_string());
        }
        if self.fetch.timeout_secs == 0 {
            return Err("fetch.timeout_secs must be at least 1".to_string());
        }
        if self.redirect_url.trim().is_empty() {
            return Err("redirect_url cannot be empty".to_string());
        }
        if let Some(pos) = self
            .access
            .allow_list
            .iter()
            .position(|entry| entry.trim().is_empty())
        {
            return Err(format!("access.allow_list[{}] is empty", pos));
        }
        self.limits.validate()?;
        Ok(())
    }
}
