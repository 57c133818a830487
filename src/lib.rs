//! Heimdall - backend health checks and provider fallback chains
//!
//! Three cooperating pieces keep an application talking to *some* working
//! backend:
//!
//! - [`HealthCheckService`] polls a backend's health endpoint with bounded
//!   retries and backoff, and can wait for a backend to come up.
//! - [`ProviderFallbackService`] keeps a priority-ordered chain of providers
//!   per capability type (e.g. `"llm"`, `"tts"`), caches their health, and
//!   retries operations down the chain when a provider fails.
//! - [`RequestDeduplicator`] collapses concurrent identical requests into a
//!   single execution.
//!
//! # Fallback Example
//!
//! ```rust,no_run
//! use heimdall::{ProviderConfig, ProviderFallbackService};
//!
//! #[tokio::main]
//! async fn main() -> heimdall::Result<()> {
//!     let service = ProviderFallbackService::new();
//!     service.register_fallback_chain(
//!         "llm",
//!         vec![
//!             ProviderConfig::from_fn("ollama", "llm", 10, || async { Ok(true) }).offline(true),
//!             ProviderConfig::from_fn("openai", "llm", 100, || async { Ok(true) })
//!                 .requires_api_key(true),
//!         ],
//!     );
//!
//!     let reply = service
//!         .execute_with_fallback(
//!             "llm",
//!             |provider| async move {
//!                 // call the provider's API here
//!                 Ok::<_, std::io::Error>(format!("answered by {}", provider.name))
//!             },
//!             None,
//!         )
//!         .await?;
//!
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! # Health Check Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use heimdall::{HealthCheckConfig, HealthCheckService};
//!
//! #[tokio::main]
//! async fn main() -> heimdall::Result<()> {
//!     let service = HealthCheckService::new(
//!         HealthCheckConfig::new().backend_url("http://127.0.0.1:5000"),
//!     )?;
//!
//!     let result = service
//!         .wait_for_backend(Duration::from_secs(30), Some(&|attempt: u32, max: u32| {
//!             println!("probing backend ({attempt}/{max})");
//!         }))
//!         .await;
//!     println!("{}", result.message);
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod health;
pub mod providers;
pub mod telemetry;
mod version;

// Re-export main types at crate root
pub use config::Config;
pub use dedup::RequestDeduplicator;
pub use error::{HeimdallError, ProviderFailure, Result};
pub use health::{HealthCheckConfig, HealthCheckResult, HealthCheckService};
pub use providers::{
    AvailabilityProbe, FallbackConfig, ProviderConfig, ProviderFallbackService,
    ProviderHealthStatus,
};
pub use version::{PKG_VERSION, version_string};
