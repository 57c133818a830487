//! Backend health checking.
//!
//! [`HealthCheckService`] answers "is the backend process up?" with
//! bounded retries, optional exponential backoff and per-attempt progress
//! reporting. All outcomes are returned as a [`HealthCheckResult`].

pub mod config;
pub mod result;
pub mod service;

pub use config::{HealthCheckConfig, MAX_BACKOFF};
pub use result::HealthCheckResult;
pub use service::{HealthCheckService, ProgressFn, QUICK_CHECK_TIMEOUT};
