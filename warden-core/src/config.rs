//! Configuration
//!
//! Built-in defaults, overlaid by an optional TOML file, overlaid by `WARDEN_*`
//! environment variables (`__` separates nested keys, e.g.
//! `WARDEN_CLOCK__INTERVAL_MS=250`).

use crate::error::{ErrorContext, WardenError, WardenResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const COMPONENT: &str = "config";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    /// Base address of the remote API answering authorization checks
    pub api_url: String,
    pub storage: StorageConfig,
    pub clock: ClockConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

/// Where the durable slots live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub session_file: String,
    pub organization_file: String,
}

/// Session reconciliation timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub interval_ms: u64,
}

/// HTTP client settings for authorization round trips
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:61016".to_string(),
            storage: StorageConfig::default(),
            clock: ClockConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .map(|dir| dir.join("warden"))
                .unwrap_or_else(|| PathBuf::from(".warden")),
            session_file: "session.json".to_string(),
            organization_file: "organization.json".to_string(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: format!("warden/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl StorageConfig {
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(&self.session_file)
    }

    pub fn organization_path(&self) -> PathBuf {
        self.data_dir.join(&self.organization_file)
    }
}

impl ClockConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl WardenConfig {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("warden").join("config.toml"))
    }

    /// Layer defaults, an optional TOML file and the environment, then validate
    pub fn load(path: Option<&Path>) -> WardenResult<Self> {
        let defaults = config::Config::try_from(&WardenConfig::default())
            .map_err(|e| layering_error("defaults", e))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("WARDEN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| layering_error("build", e))?;

        let config: WardenConfig = settings
            .try_deserialize()
            .map_err(|e| layering_error("deserialize", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file without environment layering
    pub fn from_file<P: AsRef<Path>>(path: P) -> WardenResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WardenError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new(COMPONENT)
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        toml::from_str(&content).map_err(|e| WardenError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new(COMPONENT)
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Write as TOML, creating parent directories
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> WardenResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| WardenError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new(COMPONENT).with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content).map_err(|e| WardenError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new(COMPONENT)
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })
    }

    pub fn validate(&self) -> WardenResult<()> {
        let api_url = url::Url::parse(&self.api_url).map_err(|e| WardenError::Config {
            message: format!("Invalid api_url '{}': {}", self.api_url, e),
            source: Some(Box::new(e)),
            context: ErrorContext::new(COMPONENT)
                .with_operation("validate")
                .with_suggestion("Use an absolute URL such as http://localhost:61016"),
        })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(crate::config_error!(
                format!("api_url must use http or https, got '{}'", api_url.scheme()),
                COMPONENT
            ));
        }

        if self.clock.interval_ms == 0 {
            return Err(crate::config_error!(
                "clock.interval_ms must be greater than 0",
                COMPONENT
            ));
        }

        if self.http.timeout_seconds == 0 {
            return Err(crate::config_error!(
                "http.timeout_seconds must be greater than 0",
                COMPONENT
            ));
        }

        if self.storage.session_file.trim().is_empty()
            || self.storage.organization_file.trim().is_empty()
        {
            return Err(crate::config_error!(
                "storage file names must not be empty",
                COMPONENT
            ));
        }

        Ok(())
    }
}

fn layering_error(operation: &str, error: config::ConfigError) -> WardenError {
    WardenError::Config {
        message: format!("Failed to load configuration: {}", error),
        source: Some(Box::new(error)),
        context: ErrorContext::new(COMPONENT).with_operation(operation),
    }
}
