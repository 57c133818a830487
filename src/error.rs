//! Heimdall error types

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Heimdall error types
///
/// `Clone` so that a single deduplicated failure can be handed to every
/// caller waiting on the same in-flight request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HeimdallError {
    // Network errors
    #[error("Network Error: {0}")]
    Http(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("HTTP error ({status}): {message}")]
    Api { status: u16, message: String },

    // Provider chain errors
    #[error("no provider available for '{capability}'")]
    NoProvider { capability: String },

    /// Every permitted attempt in a fallback chain failed.
    #[error("All providers failed for '{capability}': {}", ProviderFailure::join(.failures))]
    AllProvidersFailed {
        capability: String,
        failures: Vec<ProviderFailure>,
    },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HeimdallError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Network failures, timeouts, rate limiting and 5xx responses are
    /// transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            HeimdallError::Http(_) | HeimdallError::Timeout(_) => true,
            HeimdallError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for HeimdallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not report the configured budget; callers that
            // know it construct `Timeout` directly.
            HeimdallError::Timeout(Duration::ZERO)
        } else if let Some(status) = err.status() {
            HeimdallError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            HeimdallError::Http(err.to_string())
        }
    }
}

/// One failed attempt inside [`HeimdallError::AllProvidersFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    /// Name of the provider the attempt ran against.
    pub provider: String,
    /// Rendered error returned by the operation.
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }

    fn join(failures: &[ProviderFailure]) -> String {
        if failures.is_empty() {
            return "no attempts were made".to_string();
        }
        failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

/// Result type alias for Heimdall operations
pub type Result<T> = std::result::Result<T, HeimdallError>;
