//! Configuration management
//!
//! This module handles loading, saving, and migrating the gsw configuration file.
//! The configuration file is stored in TOML format at `~/.config/gsw/config.toml`,
//! or under `$GSW_CONFIG_DIR` when that variable is set.
//!
//! Changes to schema_version require migration support.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::executor::ExecutorConfig;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "GSW_CONFIG_DIR";
/// Environment variable overriding the storage endpoint
pub const ENDPOINT_ENV: &str = "GSW_ENDPOINT";
/// Environment variable overriding the HMAC access key
pub const ACCESS_KEY_ENV: &str = "GSW_ACCESS_KEY";
/// Environment variable overriding the HMAC secret key
pub const SECRET_KEY_ENV: &str = "GSW_SECRET_KEY";

/// Google Cloud Storage XML (S3-interoperable) API
pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Default output format
const DEFAULT_OUTPUT: &str = "human";

/// Default color setting
const DEFAULT_COLOR: &str = "auto";

/// Default signing region; GCS accepts any value
const DEFAULT_REGION: &str = "auto";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Storage endpoint and credentials
    #[serde(default)]
    pub storage: StorageConfig,

    /// Worker pool sizing
    #[serde(default)]
    pub executor: ExecutorConfig,
}

/// Default settings for CLI behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Output format: "human" or "json"
    #[serde(default = "default_output")]
    pub output: String,

    /// Color mode: "auto", "always", or "never"
    #[serde(default = "default_color")]
    pub color: String,

    /// Show progress spinners
    #[serde(default = "default_true")]
    pub progress: bool,
}

/// Connection settings for the object store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// S3-interoperable endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Signing region
    #[serde(default = "default_region")]
    pub region: String,

    /// HMAC access key; falls back to the SDK's credential chain when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// HMAC secret key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`
    #[serde(default)]
    pub force_path_style: bool,
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            progress: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            access_key: None,
            secret_key: None,
            force_path_style: false,
        }
    }
}

impl StorageConfig {
    /// Apply overrides from a variable lookup (normally the process
    /// environment); empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Some(access_key) = lookup(ACCESS_KEY_ENV) {
            self.access_key = Some(access_key);
        }
        if let Some(secret_key) = lookup(SECRET_KEY_ENV) {
            self.secret_key = Some(secret_key);
        }
    }

    /// Static credentials, when both halves are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.access_key.as_deref()?, self.secret_key.as_deref()?))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            storage: StorageConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("gsw"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    /// If the schema version doesn't match, attempts migration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version < SCHEMA_VERSION {
            config = self.migrate(config)?;
        } else if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade gsw.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(config)
    }

    /// Load configuration and apply `GSW_*` environment overrides
    pub fn load_with_env(&self) -> Result<Config> {
        let mut config = self.load()?;
        config
            .storage
            .apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only).
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        // The file may hold an HMAC secret
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }

    /// Migrate configuration from older schema version
    fn migrate(&self, mut config: Config) -> Result<Config> {
        tracing::debug!(
            from = config.schema_version,
            to = SCHEMA_VERSION,
            "migrating configuration"
        );
        config.schema_version = SCHEMA_VERSION;
        Ok(config)
    }
}
