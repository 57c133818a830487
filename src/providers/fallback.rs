//! Provider fallback service.
//!
//! [`ProviderFallbackService`] keeps one [`FallbackChain`] per capability
//! type and walks it when providers fail.
//!
//! # Chain lifecycle
//!
//! ```text
//!   register ──► cursor at highest priority
//!                     │
//!                     │ fallback_to_next_provider / failed operation
//!                     ▼
//!               next healthy provider ──► ... ──► exhausted (no current)
//!                                                      │
//!                     ◄───────── reset_fallback_chain ─┘
//! ```
//!
//! # Health checks
//!
//! Moving forward only lands on providers whose availability probe says
//! yes. Verdicts are cached per provider name for a short TTL, and
//! concurrent checks for the same provider share one probe invocation.
//!
//! # Concurrency
//!
//! Chain state is only touched under a short synchronous lock; probes and
//! operations run with no lock held. `execute_with_fallback` walks a private
//! cursor over a snapshot of the chain and only publishes the provider that
//! served the call, and only if nobody else moved the shared cursor or
//! re-registered the chain meanwhile.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::cache::HealthCache;
use super::chain::FallbackChain;
use super::config::ProviderConfig;
use crate::clock::{Clock, SystemClock};
use crate::dedup::RequestDeduplicator;
use crate::error::ProviderFailure;
use crate::telemetry;
use crate::{HeimdallError, Result};

/// Configuration for [`ProviderFallbackService`].
///
/// ```rust
/// # use heimdall::FallbackConfig;
/// # use std::time::Duration;
/// let config = FallbackConfig::new().health_cache_ttl(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct FallbackConfig {
    /// How long an availability verdict is reused. Default: 5s.
    pub health_cache_ttl: Duration,
    /// Maximum number of providers with a cached verdict. Default: 1,000.
    pub max_cache_entries: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            health_cache_ttl: Duration::from_secs(5),
            max_cache_entries: 1_000,
        }
    }
}

impl FallbackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn health_cache_ttl(mut self, ttl: Duration) -> Self {
        self.health_cache_ttl = ttl;
        self
    }

    pub fn max_cache_entries(mut self, n: u64) -> Self {
        self.max_cache_entries = n;
        self
    }
}

/// Health snapshot of one registered provider, for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderHealthStatus {
    #[serde(rename = "type")]
    pub capability: String,
    pub provider: String,
    pub is_healthy: bool,
    pub priority: i32,
}

struct ChainSlot {
    chain: FallbackChain,
    /// Registration id; lets late writers detect a re-registered chain.
    epoch: u64,
}

/// Priority-ordered provider chains with cached health and automatic
/// fallback.
///
/// Construct one per application and share it (e.g. behind an `Arc`);
/// independent instances share no state.
pub struct ProviderFallbackService {
    chains: RwLock<HashMap<String, ChainSlot>>,
    health: HealthCache,
    probes: RequestDeduplicator<bool>,
    epochs: AtomicU64,
}

impl ProviderFallbackService {
    pub fn new() -> Self {
        Self::with_config(FallbackConfig::default())
    }

    pub fn with_config(config: FallbackConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Use `clock` for health-cache expiry.
    pub fn with_clock(config: FallbackConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            chains: RwLock::new(HashMap::new()),
            health: HealthCache::new(config.health_cache_ttl, config.max_cache_entries, clock),
            probes: RequestDeduplicator::new(),
            epochs: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // Chain management
    // ========================================================================

    /// Install the chain for `capability`, replacing any previous one.
    ///
    /// Providers are sorted by descending priority (stable for ties) and
    /// the cursor starts at the first. An empty list leaves the capability
    /// registered but with no current provider.
    pub fn register_fallback_chain(
        &self,
        capability: impl Into<String>,
        providers: Vec<ProviderConfig>,
    ) {
        let capability = capability.into();
        for provider in providers.iter().filter(|p| p.capability != capability) {
            warn!(
                capability = %capability,
                provider = %provider.name,
                declared = %provider.capability,
                "provider registered under a different capability than it declares"
            );
        }

        let chain = FallbackChain::new(providers);
        debug!(capability = %capability, providers = ?chain.names(), "registered fallback chain");
        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
        self.write().insert(capability, ChainSlot { chain, epoch });
    }

    /// Provider at the cursor, or `None` if the capability is unknown, its
    /// chain is empty, or the chain is exhausted.
    pub fn current_provider(&self, capability: &str) -> Option<ProviderConfig> {
        self.read()
            .get(capability)
            .and_then(|slot| slot.chain.current().cloned())
    }

    /// Point the chain back at its highest-priority provider.
    ///
    /// Unknown capabilities are ignored.
    pub fn reset_fallback_chain(&self, capability: &str) {
        if let Some(slot) = self.write().get_mut(capability) {
            slot.chain.reset();
            debug!(capability, "fallback chain reset");
        }
    }

    /// Snapshot of the chain registered for `capability`.
    pub fn chain(&self, capability: &str) -> Option<FallbackChain> {
        self.read().get(capability).map(|slot| slot.chain.clone())
    }

    /// Registered capability types, sorted.
    pub fn registered_capabilities(&self) -> Vec<String> {
        let mut capabilities: Vec<String> = self.read().keys().cloned().collect();
        capabilities.sort();
        capabilities
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Whether `provider` is available, consulting the cache first.
    ///
    /// A probe error counts as unavailable. Never fails.
    #[instrument(skip(self, provider), fields(provider = %provider.name))]
    pub async fn check_provider_health(&self, provider: &ProviderConfig) -> bool {
        if let Some(healthy) = self.health.fresh(&provider.name) {
            metrics::counter!(telemetry::HEALTH_CACHE_HITS_TOTAL).increment(1);
            return healthy;
        }
        metrics::counter!(telemetry::HEALTH_CACHE_MISSES_TOTAL).increment(1);

        let generation = self.health.generation();
        let probe = Arc::clone(provider.probe());
        let name = provider.name.clone();
        let healthy = self
            .probes
            .deduplicate(provider.name.clone(), move || async move {
                Ok(match probe.is_available().await {
                    Ok(available) => available,
                    Err(e) => {
                        warn!(provider = %name, error = %e, "availability probe failed");
                        false
                    }
                })
            })
            .await
            .unwrap_or(false);

        if !self.health.record_in(generation, &provider.name, healthy) {
            debug!("health cache cleared during probe, verdict not cached");
        }
        debug!(healthy, "provider health checked");
        healthy
    }

    /// Health of every registered provider, grouped by capability.
    ///
    /// Uses cached verdicts where fresh and probes the rest.
    pub async fn provider_health_status(&self) -> Vec<ProviderHealthStatus> {
        let chains: Vec<(String, Vec<ProviderConfig>)> = {
            let chains = self.read();
            let mut snapshot: Vec<_> = chains
                .iter()
                .map(|(capability, slot)| (capability.clone(), slot.chain.providers().to_vec()))
                .collect();
            snapshot.sort_by(|a, b| a.0.cmp(&b.0));
            snapshot
        };

        let mut statuses = Vec::new();
        for (capability, providers) in chains {
            for provider in providers {
                let is_healthy = self.check_provider_health(&provider).await;
                statuses.push(ProviderHealthStatus {
                    capability: capability.clone(),
                    provider: provider.name,
                    is_healthy,
                    priority: provider.priority,
                });
            }
        }
        statuses
    }

    /// Forget every cached verdict so the next check re-probes.
    pub fn clear_health_cache(&self) {
        self.health.clear();
        self.probes.clear(None);
        debug!("provider health cache cleared");
    }

    // ========================================================================
    // Fallback
    // ========================================================================

    /// Move the cursor to the next healthy provider after the current one.
    ///
    /// Returns the new current provider. When no later provider is healthy
    /// the chain becomes exhausted and `None` is returned; it stays that way
    /// until [`reset_fallback_chain()`](Self::reset_fallback_chain).
    /// Unknown capabilities return `None` untouched.
    #[instrument(skip(self))]
    pub async fn fallback_to_next_provider(&self, capability: &str) -> Option<ProviderConfig> {
        let (providers, cursor, epoch) = self.snapshot(capability)?;
        let next = self.next_healthy(&providers, cursor).await;

        {
            let mut chains = self.write();
            if let Some(slot) = chains.get_mut(capability)
                && slot.epoch == epoch
            {
                match next {
                    Some(index) => slot.chain.move_to(index),
                    None => slot.chain.exhaust(),
                }
            }
        }

        match next {
            Some(index) => {
                let provider = providers[index].clone();
                metrics::counter!(telemetry::FALLBACKS_TOTAL, "capability" => capability.to_owned())
                    .increment(1);
                info!(provider = %provider.name, "fell back to next provider");
                Some(provider)
            }
            None => {
                warn!("no healthy provider left in chain");
                None
            }
        }
    }

    /// Run `operation` against the current provider, falling back along the
    /// chain on failure.
    ///
    /// Each failure moves to the next healthy provider and tries again, up
    /// to `max_attempts` attempts in total (default: chain length). The first
    /// success is returned; the failed providers are marked unhealthy in the
    /// cache and the provider that succeeded becomes the chain's current one.
    ///
    /// # Errors
    ///
    /// - [`HeimdallError::NoProvider`] if the capability is unknown or its
    ///   chain is empty.
    /// - [`HeimdallError::AllProvidersFailed`] when every permitted attempt
    ///   failed, no healthy provider is left, or the chain was already
    ///   exhausted.
    #[instrument(skip(self, operation))]
    pub async fn execute_with_fallback<T, E, F, Fut>(
        &self,
        capability: &str,
        mut operation: F,
        max_attempts: Option<usize>,
    ) -> Result<T>
    where
        F: FnMut(ProviderConfig) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let no_provider = || HeimdallError::NoProvider {
            capability: capability.to_string(),
        };
        let (providers, start, epoch) = self.snapshot(capability).ok_or_else(no_provider)?;
        if providers.is_empty() {
            return Err(no_provider());
        }

        let max_attempts = max_attempts.unwrap_or(providers.len()).max(1);
        let mut failures = Vec::new();
        let mut cursor = start;

        while cursor < providers.len() {
            let provider = &providers[cursor];
            match operation(provider.clone()).await {
                Ok(value) => {
                    Self::record_attempt(capability, &provider.name, true);
                    if cursor != start {
                        self.publish_cursor(capability, epoch, start, cursor);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    Self::record_attempt(capability, &provider.name, false);
                    let message = e.to_string();
                    warn!(
                        provider = %provider.name,
                        attempt = failures.len() + 1,
                        max_attempts,
                        error = %message,
                        "provider operation failed"
                    );
                    self.health.record(&provider.name, false);
                    failures.push(ProviderFailure::new(provider.name.clone(), message));
                }
            }

            if failures.len() >= max_attempts {
                break;
            }
            match self.next_healthy(&providers, cursor).await {
                Some(next) => {
                    metrics::counter!(telemetry::FALLBACKS_TOTAL, "capability" => capability.to_owned())
                        .increment(1);
                    debug!(from = %providers[cursor].name, to = %providers[next].name, "falling back");
                    cursor = next;
                }
                None => break,
            }
        }

        Err(HeimdallError::AllProvidersFailed {
            capability: capability.to_string(),
            failures,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// First provider after `after` whose health check passes.
    async fn next_healthy(&self, providers: &[ProviderConfig], after: usize) -> Option<usize> {
        for (index, provider) in providers.iter().enumerate().skip(after + 1) {
            if self.check_provider_health(provider).await {
                return Some(index);
            }
            debug!(provider = %provider.name, "skipping unhealthy provider");
        }
        None
    }

    /// Providers, cursor and epoch of a chain, copied out of the lock.
    fn snapshot(&self, capability: &str) -> Option<(Vec<ProviderConfig>, usize, u64)> {
        self.read().get(capability).map(|slot| {
            (
                slot.chain.providers().to_vec(),
                slot.chain.cursor(),
                slot.epoch,
            )
        })
    }

    /// Move the shared cursor to `index` if it still sits at `expected` in
    /// the same registration.
    fn publish_cursor(&self, capability: &str, epoch: u64, expected: usize, index: usize) {
        let mut chains = self.write();
        if let Some(slot) = chains.get_mut(capability)
            && slot.epoch == epoch
            && slot.chain.cursor() == expected
        {
            slot.chain.move_to(index);
        }
    }

    fn record_attempt(capability: &str, provider: &str, ok: bool) {
        metrics::counter!(telemetry::PROVIDER_ATTEMPTS_TOTAL,
            "capability" => capability.to_owned(),
            "provider" => provider.to_owned(),
            "status" => if ok { "ok" } else { "error" },
        )
        .increment(1);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, ChainSlot>> {
        self.chains.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, ChainSlot>> {
        self.chains.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProviderFallbackService {
    fn default() -> Self {
        Self::new()
    }
}
