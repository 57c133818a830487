//! Backend liveness polling.

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use super::config::HealthCheckConfig;
use super::result::HealthCheckResult;
use crate::telemetry;
use crate::{HeimdallError, Result};

/// Timeout applied by [`HealthCheckService::quick_check()`].
pub const QUICK_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Progress callback invoked as `(attempt_number, max_attempts)` before
/// every attempt, the first one included. Attempt numbers start at 1.
pub type ProgressFn<'a> = &'a (dyn Fn(u32, u32) + Send + Sync);

/// Polls `GET {backend_url}{health_path}` with bounded retries.
///
/// None of the checking methods return errors: every failure mode (network,
/// timeout, HTTP status) is folded into an unhealthy [`HealthCheckResult`]
/// whose message names the cause.
///
/// A `404` counts as healthy: the backend process answered, it just does not
/// expose a health route.
pub struct HealthCheckService {
    config: HealthCheckConfig,
    client: reqwest::Client,
}

impl HealthCheckService {
    /// Build a service with its own HTTP client.
    pub fn new(config: HealthCheckConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| HeimdallError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    /// Build a service around an existing client (shared connection pool).
    pub fn with_client(config: HealthCheckConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &HealthCheckConfig {
        &self.config
    }

    /// Probe the health endpoint, retrying up to `max_retries` attempts.
    #[instrument(skip(self, on_progress), fields(url = %self.config.health_url()))]
    pub async fn check_health(&self, on_progress: Option<ProgressFn<'_>>) -> HealthCheckResult {
        let start = Instant::now();
        let attempts = self.config.attempts();
        let mut last_err = None;

        for attempt in 0..attempts {
            if let Some(report) = on_progress {
                report(attempt + 1, attempts);
            }

            match self.probe(self.config.timeout).await {
                Ok(status) => {
                    metrics::counter!(telemetry::HEALTH_CHECK_ATTEMPTS_TOTAL, "status" => "ok")
                        .increment(1);
                    metrics::histogram!(telemetry::HEALTH_CHECK_DURATION_SECONDS)
                        .record(start.elapsed().as_secs_f64());
                    let message = if status == StatusCode::NOT_FOUND.as_u16() {
                        "Backend is running (no health endpoint)"
                    } else {
                        "Backend is healthy"
                    };
                    debug!(status, attempt = attempt + 1, "health check passed");
                    return HealthCheckResult::healthy(status, message, start.elapsed());
                }
                Err(e) => {
                    metrics::counter!(telemetry::HEALTH_CHECK_ATTEMPTS_TOTAL, "status" => "error")
                        .increment(1);
                    if attempt + 1 < attempts {
                        let delay = self.config.delay_for_attempt(attempt);
                        warn!(
                            attempt = attempt + 1,
                            max_attempts = attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "health check failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(attempt = attempt + 1, error = %e, "health check failed");
                    }
                    last_err = Some(e);
                }
            }
        }

        metrics::histogram!(telemetry::HEALTH_CHECK_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        let status_code = match &last_err {
            Some(HeimdallError::Api { status, .. }) => Some(*status),
            _ => None,
        };
        let cause = last_err.map_or_else(|| "no attempts were made".to_string(), |e| e.to_string());
        HealthCheckResult::unhealthy(
            status_code,
            format!("Health check failed after {attempts} attempt(s): {cause}"),
            start.elapsed(),
        )
    }

    /// Single attempt with a short timeout. Any failure is `false`.
    pub async fn quick_check(&self) -> bool {
        match self.probe(QUICK_CHECK_TIMEOUT).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "quick health check failed");
                false
            }
        }
    }

    /// Poll [`check_health()`](Self::check_health) until the backend is
    /// healthy or `timeout` has elapsed.
    ///
    /// The deadline also bounds an in-progress check, so the call returns
    /// within `timeout` (plus scheduling slack) even when individual probes
    /// are slow.
    #[instrument(skip(self, on_progress), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn wait_for_backend(
        &self,
        timeout: Duration,
        on_progress: Option<ProgressFn<'_>>,
    ) -> HealthCheckResult {
        let start = tokio::time::Instant::now();
        let deadline = start + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, self.check_health(on_progress)).await {
                Ok(result) if result.is_healthy => {
                    info!(
                        waited_ms = start.elapsed().as_millis() as u64,
                        "backend is healthy"
                    );
                    return result;
                }
                Ok(result) => debug!(message = %result.message, "backend not healthy yet"),
                Err(_) => break,
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(self.config.retry_delay.min(remaining)).await;
        }

        warn!(timeout_ms = timeout.as_millis() as u64, "backend did not become healthy");
        HealthCheckResult::unhealthy(
            None,
            format!(
                "Backend did not become healthy within {}ms",
                timeout.as_millis()
            ),
            start.elapsed(),
        )
    }

    /// One GET against the health endpoint.
    ///
    /// Returns the status code for 2xx and 404, an error otherwise.
    async fn probe(&self, timeout: Duration) -> Result<u16> {
        let response = self
            .client
            .get(self.config.health_url())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| match HeimdallError::from(e) {
                HeimdallError::Timeout(_) => HeimdallError::Timeout(timeout),
                other => other,
            })?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(status.as_u16())
        } else {
            Err(HeimdallError::Api {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            })
        }
    }
}
