//! Judge error types.
//!
//! These error types represent failures when asking an external judge to
//! evaluate a recording. Defined in `speakdrill-core` so the session loop
//! can downcast and classify errors for retry decisions without string
//! matching.

use thiserror::Error;

/// Errors that can occur when interacting with a judge backend.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The judge answered, but not with a verdict we can read.
    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),
}

impl JudgeError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            JudgeError::AuthenticationFailed(_)
                | JudgeError::ModelNotFound(_)
                | JudgeError::MalformedVerdict(_)
                | JudgeError::ApiError {
                    status: 400..=499,
                    ..
                }
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            JudgeError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_errors() {
        assert!(JudgeError::AuthenticationFailed("bad key".into()).is_permanent());
        assert!(JudgeError::ModelNotFound("nope".into()).is_permanent());
        assert!(JudgeError::MalformedVerdict("not json".into()).is_permanent());
        assert!(!JudgeError::Timeout(30).is_permanent());
        assert!(!JudgeError::RateLimited { retry_after_ms: 10 }.is_permanent());
    }

    #[test]
    fn client_errors_are_permanent_server_errors_are_not() {
        let api = |status| JudgeError::ApiError {
            status,
            message: String::new(),
        };
        assert!(api(400).is_permanent());
        assert!(api(422).is_permanent());
        assert!(!api(500).is_permanent());
        assert!(!api(503).is_permanent());
    }

    #[test]
    fn retry_after_only_for_rate_limits() {
        assert_eq!(
            JudgeError::RateLimited {
                retry_after_ms: 5000
            }
            .retry_after_ms(),
            Some(5000)
        );
        assert_eq!(JudgeError::NetworkError("reset".into()).retry_after_ms(), None);
    }
}
