use std::time::Duration;

use heimdall::{HeimdallError, ProviderFailure, Result};

#[test]
fn test_network_error_display() {
    let err = HeimdallError::Http("connection refused".to_string());
    assert_eq!(err.to_string(), "Network Error: connection refused");
}

#[test]
fn test_timeout_display() {
    let err = HeimdallError::Timeout(Duration::from_millis(1500));
    assert!(err.to_string().contains("1500ms"));
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(HeimdallError::NoProvider {
            capability: "llm".into(),
        })
    }
    assert!(returns_error().is_err());
}

#[test]
fn all_providers_failed_lists_attempts() {
    let err = HeimdallError::AllProvidersFailed {
        capability: "tts".into(),
        failures: vec![
            ProviderFailure::new("elevenlabs", "quota exceeded"),
            ProviderFailure::new("piper", "model missing"),
        ],
    };
    let msg = err.to_string();
    assert!(msg.starts_with("All providers failed for 'tts'"));
    assert!(msg.contains("elevenlabs: quota exceeded"));
    assert!(msg.contains("piper: model missing"));
}

#[test]
fn all_providers_failed_without_attempts() {
    let err = HeimdallError::AllProvidersFailed {
        capability: "llm".into(),
        failures: vec![],
    };
    assert!(err.to_string().contains("no attempts were made"));
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(HeimdallError::Http("connection reset".into()).is_transient());
    assert!(HeimdallError::Timeout(Duration::from_secs(1)).is_transient());
    for status in [429, 500, 502, 503] {
        assert!(
            HeimdallError::Api {
                status,
                message: "x".into()
            }
            .is_transient(),
            "{status} should be transient"
        );
    }
}

#[test]
fn permanent_errors() {
    for status in [400, 401, 403, 404] {
        assert!(
            !HeimdallError::Api {
                status,
                message: "x".into()
            }
            .is_transient(),
            "{status} should be permanent"
        );
    }
    assert!(!HeimdallError::Configuration("bad".into()).is_transient());
    assert!(
        !HeimdallError::NoProvider {
            capability: "llm".into()
        }
        .is_transient()
    );
}

#[test]
fn errors_are_cloneable() {
    let err = HeimdallError::Api {
        status: 503,
        message: "unavailable".into(),
    };
    let copy = err.clone();
    assert_eq!(err.to_string(), copy.to_string());
}
