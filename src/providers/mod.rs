//! Provider chains with health-aware fallback.
//!
//! Providers are grouped by capability type (e.g. `"llm"`, `"tts"`). Each
//! group forms an independent [`FallbackChain`] ordered by priority, and
//! [`ProviderFallbackService`] moves along it when the current provider
//! fails or reports itself unavailable.

pub mod cache;
pub mod chain;
pub mod config;
pub mod fallback;
pub mod probe;

pub use cache::HealthCache;
pub use chain::FallbackChain;
pub use config::ProviderConfig;
pub use fallback::{FallbackConfig, ProviderFallbackService, ProviderHealthStatus};
pub use probe::{AvailabilityProbe, BackendProbe, FnProbe, StaticProbe};
