//! Health-check configuration and backoff calculation.

use std::time::Duration;

/// Upper bound on any single delay between health-check attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Configuration for [`HealthCheckService`](super::HealthCheckService).
///
/// Immutable once the service is built. Builder-style setters:
///
/// ```rust
/// # use heimdall::HealthCheckConfig;
/// # use std::time::Duration;
/// let config = HealthCheckConfig::new()
///     .backend_url("http://127.0.0.1:5000")
///     .max_retries(5)
///     .retry_delay(Duration::from_millis(200))
///     .exponential_backoff(false);
/// ```
#[derive(Debug, Clone)]
pub struct HealthCheckConfig {
    /// Base URL of the backend, without the health path.
    pub backend_url: String,
    /// Path appended to `backend_url`. Default: `/health`.
    pub health_path: String,
    /// Total attempts per `check_health` call (including the first).
    /// Default: 3.
    pub max_retries: u32,
    /// Base delay between attempts. Default: 1s.
    pub retry_delay: Duration,
    /// Per-attempt request timeout. Default: 5s.
    pub timeout: Duration,
    /// Grow the delay geometrically between attempts. Default: true.
    pub exponential_backoff: bool,
    /// Growth factor used when `exponential_backoff` is set. Default: 1.5.
    pub backoff_factor: f64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8080".to_string(),
            health_path: "/health".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            exponential_backoff: true,
            backoff_factor: 1.5,
        }
    }
}

impl HealthCheckConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    /// Set the total number of attempts. Values below 1 are treated as 1.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> String {
        let base = self.backend_url.trim_end_matches('/');
        let path = self.health_path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Attempts per `check_health` call, never less than one.
    pub(crate) fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Delay to wait after the attempt at `attempt` (0-indexed) failed.
    ///
    /// Exponential: `retry_delay * backoff_factor^attempt`, capped at
    /// [`MAX_BACKOFF`]. Otherwise constant `retry_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return self.retry_delay;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled =
            self.retry_delay.as_nanos() as f64 * self.backoff_factor.max(1.0).powi(exponent);
        if !scaled.is_finite() || scaled >= MAX_BACKOFF.as_nanos() as f64 {
            return MAX_BACKOFF;
        }
        Duration::from_nanos(scaled.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HealthCheckConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.exponential_backoff);
        assert_eq!(config.health_url(), "http://127.0.0.1:8080/health");
    }

    #[test]
    fn health_url_joins_slashes() {
        let config = HealthCheckConfig::new()
            .backend_url("http://localhost:9000/")
            .health_path("api/health");
        assert_eq!(config.health_url(), "http://localhost:9000/api/health");
    }

    #[test]
    fn exponential_delay() {
        let config = HealthCheckConfig::new().retry_delay(Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(150));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(225));
    }

    #[test]
    fn exponential_delay_is_capped() {
        let config = HealthCheckConfig::new().retry_delay(Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(3), MAX_BACKOFF);
        assert_eq!(config.delay_for_attempt(500), MAX_BACKOFF);
    }

    #[test]
    fn constant_delay() {
        let config = HealthCheckConfig::new()
            .retry_delay(Duration::from_millis(300))
            .exponential_backoff(false);
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(300));
        assert_eq!(config.delay_for_attempt(7), Duration::from_millis(300));
    }

    #[test]
    fn zero_retries_still_makes_one_attempt() {
        assert_eq!(HealthCheckConfig::new().max_retries(0).attempts(), 1);
    }
}
