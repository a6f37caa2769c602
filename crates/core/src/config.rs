//! Client configuration
//!
//! Values come from built-in defaults, an optional configuration file and
//! `CONTACTS_*` environment variables, in increasing order of precedence.

use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: u32 = 50;

/// Settings for talking to the contacts API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST API (e.g. `http://localhost:8000/api`)
    pub api_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Default number of contacts per page
    pub page_size: u32,

    /// Directory holding the persisted session and logs
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            user_agent: format!("contacts-client/{}", env!("CARGO_PKG_VERSION")),
            page_size: 10,
            data_dir: default_data_dir(),
        }
    }
}

/// Platform data directory, overridable with `CONTACTS_STATE_DIR`
pub fn default_data_dir() -> PathBuf {
    std::env::var("CONTACTS_STATE_DIR").map_or_else(
        |_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("contacts")
        },
        PathBuf::from,
    )
}

impl ClientConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the result
    /// fails validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("timeout_secs", defaults.timeout_secs)?
            .set_default("user_agent", defaults.user_agent)?
            .set_default("page_size", i64::from(defaults.page_size))?
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config: Self = builder
            .add_source(config::Environment::with_prefix("CONTACTS"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and formats
    pub fn validate(&self) -> Result<(), ConfigError> {
        validators::validate_url(&self.api_url, "api_url")?;
        validators::validate_range(self.page_size, 1, MAX_PAGE_SIZE, "page_size")?;
        validators::validate_range(self.timeout_secs, 1, u64::MAX, "timeout_secs")?;
        validators::validate_not_empty(&self.user_agent, "user_agent")?;
        Ok(())
    }

    /// Location of the persisted session file
    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

/// Common validation helpers
pub mod validators {
    use config::ConfigError;

    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::Message(format!("{field}: cannot be empty")));
        }
        Ok(())
    }

    /// Validate URL format, requiring an http(s) scheme
    pub fn validate_url(url: &str, field: &str) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ConfigError::Message(format!("{field}: invalid URL - {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "{field}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        Ok(())
    }

    /// Validate that a value is within range
    pub fn validate_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<(), ConfigError> {
        if value < min || value > max {
            return Err(ConfigError::Message(format!(
                "{field}: must be between {min} and {max}"
            )));
        }
        Ok(())
    }
}
