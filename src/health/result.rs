//! Outcome of a backend health check.

use std::time::{Duration, SystemTime};

use serde::Serialize;

/// Typed outcome of a health check. Failures are reported here rather than
/// as errors so consumers can render `message` directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    pub is_healthy: bool,
    /// Status code of the last HTTP response, if one was received.
    pub status_code: Option<u16>,
    pub message: String,
    /// Time spent in the call, retries and backoff included.
    #[serde(rename = "latency_ms", serialize_with = "as_millis")]
    pub latency: Duration,
    pub timestamp: SystemTime,
}

impl HealthCheckResult {
    pub fn healthy(status_code: u16, message: impl Into<String>, latency: Duration) -> Self {
        Self {
            is_healthy: true,
            status_code: Some(status_code),
            message: message.into(),
            latency,
            timestamp: SystemTime::now(),
        }
    }

    pub fn unhealthy(
        status_code: Option<u16>,
        message: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            is_healthy: false,
            status_code,
            message: message.into(),
            latency,
            timestamp: SystemTime::now(),
        }
    }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
