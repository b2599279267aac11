use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub metrics: MetricsSettings,
    #[serde(default)]
    pub mock: MockSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Remote candidate service
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_rate_interval_ms")]
    pub rate_interval_ms: u64,
}

impl ApiSettings {
    /// Settings pointing at `base_url` with every other knob at its default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    /// The bearer token, with an empty string treated as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_base_ms: default_retry_base_ms(),
            rate_interval_ms: default_rate_interval_ms(),
        }
    }
}

fn default_base_url() -> String { "http://localhost:8080".to_string() }
fn default_timeout_secs() -> u64 { 15 }
fn default_retry_count() -> u32 { 3 }
fn default_retry_base_ms() -> u64 { 300 }
fn default_rate_interval_ms() -> u64 { 500 }

/// Dispatch pool sizing
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_capacity")]
    pub result_capacity: usize,
    #[serde(default = "default_swipe_delay_ms")]
    pub swipe_delay_ms: u64,
}

impl PoolSettings {
    pub fn swipe_delay(&self) -> Duration {
        Duration::from_millis(self.swipe_delay_ms)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_capacity(),
            result_capacity: default_capacity(),
            swipe_delay_ms: default_swipe_delay_ms(),
        }
    }
}

fn default_workers() -> usize { 4 }
fn default_capacity() -> usize { 256 }
fn default_swipe_delay_ms() -> u64 { 200 }

#[derive(Debug, Clone, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_interval_secs() -> u64 { 2 }
fn default_batch_size() -> usize { 30 }

/// Prometheus scrape endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_metrics_port(),
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_metrics_port() -> u16 { 9090 }

/// Mock fixture server
#[derive(Debug, Clone, Deserialize)]
pub struct MockSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_mock_port")]
    pub port: u16,
    #[serde(default = "default_match_rate")]
    pub match_rate: f64,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_mock_port(),
            match_rate: default_match_rate(),
        }
    }
}

fn default_mock_port() -> u16 { 8080 }
fn default_match_rate() -> f64 { 0.18 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SWIPEBOT__)
    /// 5. `API_BASE` / `API_TOKEN` / `LOG_LEVEL` / `LOG_FORMAT`
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SWIPEBOT__POOL__WORKERS -> pool.workers
            .add_source(
                Environment::with_prefix("SWIPEBOT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = apply_legacy_env(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SWIPEBOT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the short-form `API_BASE`, `API_TOKEN`, `LOG_LEVEL` and `LOG_FORMAT`
/// variables on top of the layered config.
fn apply_legacy_env(settings: Config) -> Result<Config, ConfigError> {
    apply_overrides(settings, |key| std::env::var(key).ok())
}

fn apply_overrides<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(settings);

    if let Some(base) = lookup("API_BASE").filter(|base| !base.is_empty()) {
        builder = builder.set_override("api.base_url", base)?;
    }
    if let Some(token) = lookup("API_TOKEN") {
        builder = builder.set_override("api.token", token)?;
    }
    if let Some(level) = lookup("LOG_LEVEL").filter(|level| !level.is_empty()) {
        builder = builder.set_override("logging.level", level)?;
    }
    if let Some(format) = lookup("LOG_FORMAT").filter(|format| !format.is_empty()) {
        builder = builder.set_override("logging.format", format)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_settings() {
        let api = ApiSettings::default();
        assert_eq!(api.base_url, "http://localhost:8080");
        assert_eq!(api.retry_count, 3);
        assert_eq!(api.retry_base(), Duration::from_millis(300));
        assert_eq!(api.rate_interval(), Duration::from_millis(500));
        assert_eq!(api.timeout(), Duration::from_secs(15));
        assert!(api.bearer_token().is_none());
    }

    #[test]
    fn test_empty_token_is_absent() {
        let mut api = ApiSettings::with_base_url("http://example.test");
        api.token = Some(String::new());
        assert!(api.bearer_token().is_none());

        api.token = Some("t1".to_string());
        assert_eq!(api.bearer_token(), Some("t1"));
    }

    #[test]
    fn test_default_pool() {
        let pool = PoolSettings::default();
        assert_eq!(pool.workers, 4);
        assert_eq!(pool.queue_capacity, 256);
        assert_eq!(pool.result_capacity, 256);
        assert_eq!(pool.swipe_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let settings: Settings = Config::builder()
            .build()
            .and_then(|c| c.try_deserialize())
            .unwrap();
        assert_eq!(settings.polling.batch_size, 30);
        assert_eq!(settings.metrics.port, 9090);
        assert_eq!(settings.mock.port, 8080);
        assert_eq!(settings.logging.format, "json");
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_short_form_variables_override_layers() {
        let layered = Config::builder()
            .set_override("api.base_url", "http://from-file:1")
            .unwrap()
            .set_override("logging.level", "warn")
            .unwrap()
            .build()
            .unwrap();

        let env = |key: &str| match key {
            "API_TOKEN" => Some("t1".to_string()),
            "LOG_LEVEL" => Some("debug".to_string()),
            "LOG_FORMAT" => Some("pretty".to_string()),
            "API_BASE" => Some(String::new()),
            _ => None,
        };
        let settings: Settings = apply_overrides(layered, env)
            .unwrap()
            .try_deserialize()
            .unwrap();

        // Empty API_BASE leaves the layered value alone.
        assert_eq!(settings.api.base_url, "http://from-file:1");
        assert_eq!(settings.api.bearer_token(), Some("t1"));
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, "pretty");
    }
}
