//! Application settings.
//!
//! Settings come from a TOML file (default `./config.toml`, overridable with
//! `AMBASSADOR_CONFIG`). Every field has a default, so a missing file is not an
//! error. `DATABASE_URL` and `LISTEN_ADDR` from the environment win over the file.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "AMBASSADOR_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// `SQLite` connection string; `None` falls back to `DATABASE_URL` or the built-in default
    pub database_url: Option<String>,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Usage reporting settings
    pub reporting: ReportingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the portal listens on
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Usage reporting settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Trailing window used when a request does not ask for one
    pub default_window_months: u32,
    /// How long an aggregated result may be served from cache
    pub cache_ttl_secs: u64,
    /// Upper bound on cached results
    pub cache_max_entries: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            default_window_months: 12,
            cache_ttl_secs: 300,
            cache_max_entries: 1024,
        }
    }
}

impl AppConfig {
    /// Connection string to use: the configured one, else the default location.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    fn validate(&self) -> Result<()> {
        if self.reporting.default_window_months == 0 {
            return Err(Error::Config {
                message: "reporting.default_window_months must be at least 1".to_string(),
            });
        }
        if self.reporting.cache_max_entries == 0 {
            return Err(Error::Config {
                message: "reporting.cache_max_entries must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parses configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A value is out of range
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads the application configuration: config file (if present) plus environment overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        info!(path, "No config file found, using defaults");
        AppConfig::default()
    };

    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database_url = Some(url);
    }
    if let Ok(addr) = std::env::var("LISTEN_ADDR") {
        config.server.listen_addr = addr;
    }

    Ok(config)
}
