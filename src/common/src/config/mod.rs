use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Settings file picked up from the working directory when no path is given.
pub const DEFAULT_SETTINGS_FILE: &str = "backup-pruner.toml";

/// Prefix for environment overrides, nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "BACKUP_PRUNER__";

/// Where to find OCI credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OciConfig {
    /// Path to the OCI SDK/CLI config file
    pub config_file: String,
    /// Profile section inside the config file
    pub profile: String,
    /// Region override, takes precedence over the profile's region
    pub region: Option<String>,
}

impl Default for OciConfig {
    fn default() -> Self {
        Self {
            config_file: "~/.oci/config".to_string(),
            profile: "DEFAULT".to_string(),
            region: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Number of concurrent delete workers
    pub workers: usize,
    /// Pause a worker takes after each successful delete
    #[serde(with = "humantime_serde")]
    pub sleep_between: Duration,
    /// Report the deletion plan without deleting anything
    pub dry_run: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            sleep_between: Duration::from_millis(500),
            dry_run: false,
        }
    }
}

/// Retry behaviour for throttled (429) and server-side (5xx) failures.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one
    pub max_attempts: u32,
    /// Upper bound on the time spent retrying a single request
    #[serde(with = "humantime_serde")]
    pub max_elapsed: Duration,
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            max_elapsed: Duration::from_secs(300),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Page size requested from list endpoints
    pub page_limit: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            page_limit: 100,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Verbosity, accepts both `warn` and `WARNING` style names
    pub level: String,
    /// Optional file receiving a copy of every log line
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Credential source
    pub oci: OciConfig,
    /// Deletion behaviour
    pub cleanup: CleanupConfig,
    /// Retry policy for Block Storage calls
    pub retry: RetryConfig,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Log verbosity and destination
    pub logging: LoggingConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl Configuration {
    /// Load defaults, then `backup-pruner.toml` if present, then environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from_path(Path::new(DEFAULT_SETTINGS_FILE))
    }

    /// Same layering as [`Configuration::load`] with an explicit settings file.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cleanup.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cleanup.workers",
                message: "must be a positive integer".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts",
                message: "must be at least 1".to_string(),
            });
        }

        // Written this way round so NaN is rejected too.
        if !(self.retry.backoff_multiplier >= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "retry.backoff_multiplier",
                message: format!("must be >= 1.0, got {}", self.retry.backoff_multiplier),
            });
        }

        if self.http.page_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.page_limit",
                message: "must be positive".to_string(),
            });
        }

        if self.oci.profile.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "oci.profile",
                message: "cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}
