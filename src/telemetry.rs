//! Telemetry metric name constants.
//!
//! Centralised metric names for heimdall operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `heimdall_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `capability`: provider chain type (e.g. "llm", "tts")
//! - `provider`: provider name within a chain
//! - `status`: outcome: "ok" or "error"

/// Individual HTTP probes issued against the backend health endpoint.
///
/// Labels: `status` ("ok" | "error").
pub const HEALTH_CHECK_ATTEMPTS_TOTAL: &str = "heimdall_health_check_attempts_total";

/// Wall time of a complete `check_health` call, retries included.
pub const HEALTH_CHECK_DURATION_SECONDS: &str = "heimdall_health_check_duration_seconds";

/// Operation attempts made through `execute_with_fallback`.
///
/// Labels: `capability`, `provider`, `status` ("ok" | "error").
pub const PROVIDER_ATTEMPTS_TOTAL: &str = "heimdall_provider_attempts_total";

/// Times a chain moved past a provider to the next healthy one.
///
/// Labels: `capability`.
pub const FALLBACKS_TOTAL: &str = "heimdall_fallbacks_total";

/// Provider health lookups answered from the cache.
pub const HEALTH_CACHE_HITS_TOTAL: &str = "heimdall_health_cache_hits_total";

/// Provider health lookups that had to invoke the availability probe.
pub const HEALTH_CACHE_MISSES_TOTAL: &str = "heimdall_health_cache_misses_total";

/// Callers that joined an already in-flight deduplicated request.
pub const DEDUP_JOINS_TOTAL: &str = "heimdall_dedup_joins_total";
