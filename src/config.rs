//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (e.g. a `--config` CLI flag)
//! 2. `~/.cambio/config.toml` (user)
//! 3. `/etc/cambio/config.toml` (system)
//!
//! Alternatively [`CambioConfig::from_env`] reads the deployment variables
//! `PYDOLARVE_BASE_URL`, `PYDOLARVE_TIMEOUT_MS`, `RATES_TTL_SECONDS` and
//! `RATES_USER_AGENT`.
//!
//! ```toml
//! [upstream]
//! base_url = "https://pydolarve.org/api/v2"
//! timeout_ms = 8000
//!
//! [cache]
//! ttl_seconds = 60
//!
//! [retry]
//! max_retries = 3
//! base_delay_ms = 100
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::{self, DEFAULT_TTL_SECS};
use crate::transport::RetryConfig;
use crate::version::default_user_agent;
use crate::{CambioError, Result};

/// Crate configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CambioConfig {
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Upstream rate provider.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Absolute http(s) base URL, e.g. `https://pydolarve.org/api/v2`.
    pub base_url: String,
    /// Per-attempt timeout in milliseconds (default: 8000).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// `User-Agent` header (default: `cambio/<version>`).
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_ms() -> u64 {
    8000
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Base TTL in seconds, clamped to `[5, 1800]` (default: 60).
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_TTL_SECS
}

/// Retry settings as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: false,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl From<RetrySettings> for RetryConfig {
    fn from(s: RetrySettings) -> Self {
        RetryConfig::new()
            .max_retries(s.max_retries)
            .base_delay(Duration::from_millis(s.base_delay_ms))
            .max_delay(Duration::from_millis(s.max_delay_ms))
            .jitter(s.jitter)
    }
}

impl CambioConfig {
    /// Minimal configuration pointing at `base_url`, defaults elsewhere.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            upstream: UpstreamConfig {
                base_url: base_url.into(),
                timeout_ms: default_timeout_ms(),
                user_agent: None,
            },
            cache: CacheConfig::default(),
            retry: RetrySettings::default(),
        }
    }

    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.cambio/config.toml`
    /// 3. `/etc/cambio/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            CambioError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| CambioError::Configuration(format!("In config file {path:?}: {e}")))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CambioError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("PYDOLARVE_BASE_URL").ok_or_else(|| {
            CambioError::Configuration("PYDOLARVE_BASE_URL is not set".to_string())
        })?;
        let mut config = Self::new(base_url);

        if let Some(raw) = lookup("PYDOLARVE_TIMEOUT_MS") {
            config.upstream.timeout_ms = parse_number("PYDOLARVE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("RATES_TTL_SECONDS") {
            config.cache.ttl_seconds = parse_number("RATES_TTL_SECONDS", &raw)?;
        }
        config.upstream.user_agent = lookup("RATES_USER_AGENT");

        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be repaired by clamping.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.upstream.base_url).map_err(|e| {
            CambioError::Configuration(format!(
                "invalid upstream base_url {:?}: {e}",
                self.upstream.base_url
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(CambioError::Configuration(format!(
                "upstream base_url must be an absolute http(s) URL, got {:?}",
                self.upstream.base_url
            )));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(CambioError::Configuration(
                "upstream timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.upstream.timeout_ms)
    }

    /// Configured base TTL after clamping, before jitter.
    pub fn ttl_base(&self) -> Duration {
        cache::ttl::clamp_base(Duration::from_secs(self.cache.ttl_seconds))
    }

    /// Jittered TTL. Draws a new value on every call; compute it once per
    /// service instance.
    pub fn cache_ttl(&self) -> Duration {
        cache::jittered_ttl(self.cache.ttl_seconds)
    }

    pub fn user_agent(&self) -> String {
        self.upstream
            .user_agent
            .clone()
            .unwrap_or_else(default_user_agent)
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(CambioError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".cambio").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/cambio/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(CambioError::Configuration(
            "No config file found. Create ~/.cambio/config.toml or /etc/cambio/config.toml"
                .to_string(),
        ))
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CambioError::Configuration(format!("{name} must be a number, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [upstream]
            base_url = "https://pydolarve.org/api/v2"
        "#;
        let config = CambioConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.upstream.base_url, "https://pydolarve.org/api/v2");
        // Defaults preserved
        assert_eq!(config.upstream.timeout_ms, 8000);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.retry.max_retries, 3);
        assert!(config.user_agent().starts_with("cambio/"));
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [upstream]
            base_url = "http://localhost:9000"
            timeout_ms = 2500
            user_agent = "ocr-ves-api/1.0.0"

            [cache]
            ttl_seconds = 120

            [retry]
            max_retries = 5
            base_delay_ms = 50
            max_delay_ms = 1000
            jitter = true
        "#;
        let config = CambioConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.user_agent(), "ocr-ves-api/1.0.0");
        assert_eq!(config.ttl_base(), Duration::from_secs(120));

        let retry: RetryConfig = config.retry.into();
        assert_eq!(retry.max_retries, 5);
        assert_eq!(retry.base_delay, Duration::from_millis(50));
        assert_eq!(retry.max_delay, Duration::from_secs(1));
        assert!(retry.jitter);
    }

    #[test]
    fn missing_upstream_is_an_error() {
        let err = CambioConfig::from_toml_str("[cache]\nttl_seconds = 30\n").unwrap_err();
        assert!(matches!(err, CambioError::Configuration(_)));
    }

    #[test]
    fn relative_or_non_http_urls_are_rejected() {
        assert!(CambioConfig::new("pydolarve.org/api").validate().is_err());
        assert!(CambioConfig::new("ftp://pydolarve.org").validate().is_err());
        assert!(CambioConfig::new("https://pydolarve.org").validate().is_ok());
    }

    #[test]
    fn ttl_base_is_clamped() {
        let mut config = CambioConfig::new("https://pydolarve.org");
        config.cache.ttl_seconds = 1;
        assert_eq!(config.ttl_base(), Duration::from_secs(5));
        config.cache.ttl_seconds = 7200;
        assert_eq!(config.ttl_base(), Duration::from_secs(1800));
    }

    #[test]
    fn env_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PYDOLARVE_BASE_URL", "https://pydolarve.org/api/v2"),
            ("PYDOLARVE_TIMEOUT_MS", "3000"),
            ("RATES_TTL_SECONDS", "90"),
        ]);
        let config =
            CambioConfig::from_env_with(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.upstream.timeout_ms, 3000);
        assert_eq!(config.cache.ttl_seconds, 90);
        assert_eq!(config.upstream.user_agent, None);
    }

    #[test]
    fn env_requires_base_url() {
        let err = CambioConfig::from_env_with(|_| None).unwrap_err();
        assert!(err.to_string().contains("PYDOLARVE_BASE_URL"));
    }

    #[test]
    fn env_rejects_garbage_numbers() {
        let err = CambioConfig::from_env_with(|name| match name {
            "PYDOLARVE_BASE_URL" => Some("https://pydolarve.org".into()),
            "RATES_TTL_SECONDS" => Some("soon".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("RATES_TTL_SECONDS"));
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = CambioConfig::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }
}
