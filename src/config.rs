//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. explicit path (e.g. the CLI's `--config <path>`)
//! 2. `~/.heimdall/config.toml` (user)
//! 3. `/etc/heimdall/config.toml` (system)
//!
//! Durations are given in milliseconds. Every field is optional and falls
//! back to the runtime defaults of [`HealthCheckConfig`] and
//! [`FallbackConfig`].
//!
//! ```toml
//! [health]
//! backend_url = "http://127.0.0.1:5000"
//! max_retries = 5
//! retry_delay_ms = 500
//! exponential_backoff = true
//!
//! [fallback]
//! health_cache_ttl_ms = 10000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::health::HealthCheckConfig;
use crate::providers::FallbackConfig;
use crate::{HeimdallError, Result};

/// File-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub health: HealthSection,
    #[serde(default)]
    pub fallback: FallbackSection,
}

/// `[health]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthSection {
    pub backend_url: String,
    pub health_path: String,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub exponential_backoff: bool,
    pub backoff_factor: f64,
}

impl Default for HealthSection {
    fn default() -> Self {
        let defaults = HealthCheckConfig::default();
        Self {
            backend_url: defaults.backend_url,
            health_path: defaults.health_path,
            max_retries: defaults.max_retries,
            retry_delay_ms: millis(defaults.retry_delay),
            timeout_ms: millis(defaults.timeout),
            exponential_backoff: defaults.exponential_backoff,
            backoff_factor: defaults.backoff_factor,
        }
    }
}

impl From<HealthSection> for HealthCheckConfig {
    fn from(section: HealthSection) -> Self {
        HealthCheckConfig::new()
            .backend_url(section.backend_url)
            .health_path(section.health_path)
            .max_retries(section.max_retries)
            .retry_delay(Duration::from_millis(section.retry_delay_ms))
            .timeout(Duration::from_millis(section.timeout_ms))
            .exponential_backoff(section.exponential_backoff)
            .backoff_factor(section.backoff_factor)
    }
}

/// `[fallback]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackSection {
    pub health_cache_ttl_ms: u64,
    pub max_cache_entries: u64,
}

impl Default for FallbackSection {
    fn default() -> Self {
        let defaults = FallbackConfig::default();
        Self {
            health_cache_ttl_ms: millis(defaults.health_cache_ttl),
            max_cache_entries: defaults.max_cache_entries,
        }
    }
}

impl From<FallbackSection> for FallbackConfig {
    fn from(section: FallbackSection) -> Self {
        FallbackConfig::new()
            .health_cache_ttl(Duration::from_millis(section.health_cache_ttl_ms))
            .max_cache_entries(section.max_cache_entries)
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, the first existing
    /// standard location is used, or defaults when there is none.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HeimdallError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HeimdallError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    pub fn health_check(&self) -> HealthCheckConfig {
        self.health.clone().into()
    }

    pub fn fallback(&self) -> FallbackConfig {
        self.fallback.clone().into()
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HeimdallError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".heimdall").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/heimdall/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl FromStr for Config {
    type Err = HeimdallError;

    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| HeimdallError::Configuration(format!("Failed to parse config: {e}")))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_matches_runtime_defaults() {
        let config: Config = "".parse().unwrap();
        let health = config.health_check();
        let defaults = HealthCheckConfig::default();
        assert_eq!(health.backend_url, defaults.backend_url);
        assert_eq!(health.max_retries, defaults.max_retries);
        assert_eq!(health.retry_delay, defaults.retry_delay);
        assert_eq!(health.timeout, defaults.timeout);
        assert_eq!(
            config.fallback().health_cache_ttl,
            FallbackConfig::default().health_cache_ttl
        );
    }

    #[test]
    fn parse_partial_health_section() {
        let config: Config = r#"
            [health]
            backend_url = "http://10.0.0.2:7000"
            retry_delay_ms = 250
        "#
        .parse()
        .unwrap();
        let health = config.health_check();
        assert_eq!(health.backend_url, "http://10.0.0.2:7000");
        assert_eq!(health.retry_delay, Duration::from_millis(250));
        // Defaults preserved
        assert_eq!(health.health_path, "/health");
        assert!(health.exponential_backoff);
    }

    #[test]
    fn parse_full_config() {
        let config: Config = r#"
            [health]
            backend_url = "http://localhost:5000"
            health_path = "/api/ping"
            max_retries = 6
            retry_delay_ms = 100
            timeout_ms = 1500
            exponential_backoff = false
            backoff_factor = 2.0

            [fallback]
            health_cache_ttl_ms = 30000
            max_cache_entries = 64
        "#
        .parse()
        .unwrap();
        let health = config.health_check();
        assert_eq!(health.health_url(), "http://localhost:5000/api/ping");
        assert_eq!(health.max_retries, 6);
        assert_eq!(health.timeout, Duration::from_millis(1500));
        assert!(!health.exponential_backoff);
        assert_eq!(health.backoff_factor, 2.0);

        let fallback = config.fallback();
        assert_eq!(fallback.health_cache_ttl, Duration::from_secs(30));
        assert_eq!(fallback.max_cache_entries, 64);
    }

    #[test]
    fn invalid_toml_is_configuration_error() {
        let err = "[health".parse::<Config>().unwrap_err();
        assert!(matches!(err, HeimdallError::Configuration(_)));
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/heimdall.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }
}
