//! Provider descriptors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::probe::{AvailabilityProbe, FnProbe};
use crate::Result;

/// One provider in a capability's fallback chain.
///
/// Cheap to clone: the probe is shared behind an `Arc`. A registered chain
/// is never edited in place; to change it, register the whole chain again.
///
/// ```rust
/// # use heimdall::providers::{ProviderConfig, StaticProbe};
/// let local = ProviderConfig::new("piper", "tts", 10, StaticProbe(true)).offline(true);
/// let cloud = ProviderConfig::from_fn("elevenlabs", "tts", 20, || async { Ok(true) })
///     .requires_api_key(true);
/// assert_eq!(cloud.priority, 20);
/// assert!(local.is_offline);
/// ```
#[derive(Clone)]
pub struct ProviderConfig {
    /// Unique name within the capability's chain. Also the health-cache key.
    pub name: String,
    /// Capability the provider serves (e.g. `"llm"`, `"tts"`).
    pub capability: String,
    /// Higher sorts first.
    pub priority: i32,
    /// Informational; not enforced by the fallback service.
    pub requires_api_key: bool,
    /// Informational; not enforced by the fallback service.
    pub is_offline: bool,
    probe: Arc<dyn AvailabilityProbe>,
}

impl ProviderConfig {
    pub fn new(
        name: impl Into<String>,
        capability: impl Into<String>,
        priority: i32,
        probe: impl AvailabilityProbe + 'static,
    ) -> Self {
        Self::with_probe(name, capability, priority, Arc::new(probe))
    }

    /// Build with an already shared probe.
    pub fn with_probe(
        name: impl Into<String>,
        capability: impl Into<String>,
        priority: i32,
        probe: Arc<dyn AvailabilityProbe>,
    ) -> Self {
        Self {
            name: name.into(),
            capability: capability.into(),
            priority,
            requires_api_key: false,
            is_offline: false,
            probe,
        }
    }

    /// Build with an async closure as the availability predicate.
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        capability: impl Into<String>,
        priority: i32,
        check: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        Self::new(name, capability, priority, FnProbe::new(check))
    }

    pub fn requires_api_key(mut self, required: bool) -> Self {
        self.requires_api_key = required;
        self
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.is_offline = offline;
        self
    }

    pub fn probe(&self) -> &Arc<dyn AvailabilityProbe> {
        &self.probe
    }

    /// Invoke the probe directly, bypassing any health cache.
    pub async fn is_available(&self) -> Result<bool> {
        self.probe.is_available().await
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .field("priority", &self.priority)
            .field("requires_api_key", &self.requires_api_key)
            .field("is_offline", &self.is_offline)
            .finish_non_exhaustive()
    }
}
