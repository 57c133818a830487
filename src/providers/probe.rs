//! Availability probes: the only contract between the fallback engine and
//! concrete provider implementations.
//!
//! The engine never looks at a provider's type. It asks the provider's
//! [`AvailabilityProbe`] whether it is up, and an error from the probe is
//! read as "not available".

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::health::HealthCheckService;

/// Asynchronous liveness predicate for one provider.
#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// Whether the provider can currently serve requests.
    ///
    /// Errors are treated the same as `Ok(false)` by the fallback service.
    async fn is_available(&self) -> Result<bool>;
}

/// Probe backed by an async closure.
///
/// ```rust
/// # use heimdall::providers::FnProbe;
/// let probe = FnProbe::new(|| async { Ok::<_, heimdall::HeimdallError>(true) });
/// ```
pub struct FnProbe<F> {
    check: F,
}

impl<F> FnProbe<F> {
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F, Fut> AvailabilityProbe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send,
{
    async fn is_available(&self) -> Result<bool> {
        (self.check)().await
    }
}

/// Probe with a fixed answer, for providers that are always (or never) up,
/// e.g. bundled offline engines.
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl AvailabilityProbe for StaticProbe {
    async fn is_available(&self) -> Result<bool> {
        Ok(self.0)
    }
}

/// Probe that asks a [`HealthCheckService`] for a single quick check.
///
/// Lets a provider that fronts an HTTP backend reuse the backend's health
/// endpoint as its availability signal.
pub struct BackendProbe {
    service: Arc<HealthCheckService>,
}

impl BackendProbe {
    pub fn new(service: Arc<HealthCheckService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AvailabilityProbe for BackendProbe {
    async fn is_available(&self) -> Result<bool> {
        Ok(self.service.quick_check().await)
    }
}
