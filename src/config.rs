use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
pub const CONFIG_DIR: &str = "config";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_IDEMPOTENCY_TTL_SECS: u64 = 600;
const DEFAULT_CUSTOMER_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_PER_PAGE: i64 = 20;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRACKING_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TRACKING_ENDPOINT: &str = "https://api.kdniao.com/Ebusiness/EbusinessOrderHandle.aspx";

/// Connection settings for the backend record store
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct BackendConfig {
    /// Base URL of the data API, e.g. `https://fm.example.com/fmi/data/vLatest`
    #[validate(length(min = 1))]
    pub url: String,
    #[validate(length(min = 1))]
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_backend_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,
}

/// Courier tracking service credentials
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct TrackingConfig {
    #[serde(default)]
    pub business_id: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default = "default_tracking_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_tracking_timeout")]
    pub timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            business_id: String::new(),
            api_secret: String::new(),
            endpoint: default_tracking_endpoint(),
            timeout_secs: default_tracking_timeout(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    #[validate]
    pub backend: BackendConfig,

    /// Warehouse every list query is pinned to
    #[validate(length(min = 1))]
    pub warehouse_code: String,

    /// Account name sent as the creator of new entries and as the audit user
    #[serde(default = "default_account")]
    pub account_name: String,

    #[serde(default)]
    pub printer_name: String,

    /// Directory rendered label files are written to
    #[serde(default = "default_label_dir")]
    pub label_dir: String,

    /// SQLite URL of the printed-label ledger
    pub ledger_url: String,

    #[serde(default = "default_poll_interval")]
    #[validate(range(min = 1, max = 3600))]
    pub poll_interval_secs: u64,

    /// Print preparation labels for shipments entering preparation
    #[serde(default)]
    pub auto_print_preparation: bool,

    #[serde(default = "default_idempotency_ttl")]
    #[validate(range(min = 1))]
    pub idempotency_ttl_secs: u64,

    #[serde(default = "default_customer_cache_ttl")]
    pub customer_cache_ttl_secs: u64,

    /// Page size used when a list request carries no `per_page`
    #[serde(default = "default_per_page")]
    #[validate(custom = "validate_per_page")]
    pub default_per_page: i64,

    #[serde(default)]
    #[validate]
    pub tracking: TrackingConfig,

    /// Comma separated list of allowed CORS origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Transfer point number to display name
    #[serde(default)]
    pub transfer_points: HashMap<String, String>,
}

impl AppConfig {
    /// Configuration used by tests and local tooling; never reads the environment.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            environment: "test".into(),
            log_level: DEFAULT_LOG_LEVEL.into(),
            log_json: false,
            backend: BackendConfig {
                url: "http://localhost:8989/fmi/data/vLatest".into(),
                database: "warehouse".into(),
                username: "api".into(),
                password: "secret".into(),
                request_timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
            },
            warehouse_code: "GZWH2".into(),
            account_name: default_account(),
            printer_name: String::new(),
            label_dir: default_label_dir(),
            ledger_url: "sqlite::memory:".into(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            auto_print_preparation: false,
            idempotency_ttl_secs: DEFAULT_IDEMPOTENCY_TTL_SECS,
            customer_cache_ttl_secs: DEFAULT_CUSTOMER_CACHE_TTL_SECS,
            default_per_page: DEFAULT_PER_PAGE,
            tracking: TrackingConfig::default(),
            cors_allowed_origins: None,
            transfer_points: HashMap::from([
                ("0".to_string(), "Almaty".to_string()),
                ("1".to_string(), "Bishkek".to_string()),
            ]),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }

    pub fn customer_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.customer_cache_ttl_secs)
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_account() -> String {
    "api".to_string()
}

fn default_label_dir() -> String {
    "labels".to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_idempotency_ttl() -> u64 {
    DEFAULT_IDEMPOTENCY_TTL_SECS
}

fn default_customer_cache_ttl() -> u64 {
    DEFAULT_CUSTOMER_CACHE_TTL_SECS
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

fn default_backend_timeout() -> u64 {
    DEFAULT_BACKEND_TIMEOUT_SECS
}

fn default_tracking_timeout() -> u64 {
    DEFAULT_TRACKING_TIMEOUT_SECS
}

fn default_tracking_endpoint() -> String {
    DEFAULT_TRACKING_ENDPOINT.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_per_page(per_page: i64) -> Result<(), ValidationError> {
    if per_page == -1 || per_page >= 1 {
        Ok(())
    } else {
        let mut err = ValidationError::new("default_per_page");
        err.message = Some("Must be -1 (all records) or a positive page size".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("warehouse_bridge={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration from the default `config/` directory.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. `{dir}/default.toml`
/// 3. `{dir}/{RUN_ENV}.toml`
/// 4. Environment variables (`APP__*`)
pub fn load_config_from(dir: &str) -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(dir).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir
        );
    }

    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("ledger_url", "sqlite://printed_labels.db?mode=rwc")?
        .set_default("backend.request_timeout_secs", DEFAULT_BACKEND_TIMEOUT_SECS as i64)?
        .add_source(File::with_name(&format!("{}/default", dir)).required(false))
        .add_source(File::with_name(&format!("{}/{}", dir, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn loads_layered_file_with_defaults() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "default.toml",
            r#"
            warehouse_code = "GZWH2"
            [backend]
            url = "https://fm.example.com/fmi/data/vLatest"
            database = "warehouse"
            username = "api"
            password = "secret"
            "#,
        );

        let config = load_config_from(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.warehouse_code, "GZWH2");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.idempotency_ttl_secs, 600);
        assert_eq!(config.customer_cache_ttl_secs, 300);
        assert_eq!(config.default_per_page, 20);
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.tracking.timeout_secs, 5);
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = AppConfig::for_tests();
        config.log_level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::for_tests();
        config.default_per_page = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::for_tests();
        config.default_per_page = -1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn per_page_validator_takes_the_value() {
        assert!(validate_per_page(-1).is_ok());
        assert!(validate_per_page(20).is_ok());
        assert!(validate_per_page(0).is_err());
        assert!(validate_per_page(-5).is_err());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut config = AppConfig::for_tests();
        config.cors_allowed_origins = Some("https://a.example, ,https://b.example".into());
        assert_eq!(
            config.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
