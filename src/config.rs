//! Configuration management for the library client

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the library REST API, including the `/library-api` prefix
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a fetched collection is considered fresh
    pub stale_time_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: usize,
    pub page_size_options: Vec<usize>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationConfig {
    pub success_duration_ms: u64,
    pub error_duration_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Write logs to daily rolling files in this directory instead of stderr
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Environment variables (LIBRARY_API__BASE_URL, LIBRARY_VIEW__PAGE_SIZE, ...)
            .add_source(
                Environment::with_prefix("LIBRARY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("api.base_url", env::var("LIBRARY_API_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }
}

impl ViewConfig {
    /// Whether `size` is one of the page sizes offered to the user
    pub fn allows(&self, size: usize) -> bool {
        size > 0 && (self.page_size_options.is_empty() || self.page_size_options.contains(&size))
    }
}

impl NotificationConfig {
    pub fn success_duration(&self) -> Duration {
        Duration::from_millis(self.success_duration_ms)
    }

    pub fn error_duration(&self) -> Duration {
        Duration::from_millis(self.error_duration_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/library-api".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: 5 * 60,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            page_size_options: vec![5, 10, 25],
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            success_duration_ms: 3000,
            error_duration_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}
