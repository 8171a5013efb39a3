//! HTTP plumbing shared by the remote judges.

use speakdrill_core::error::JudgeError;

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Seconds to wait after a 429 that carries no usable `retry-after`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .expect("failed to build HTTP client")
}

pub(crate) fn send_error(e: reqwest::Error) -> JudgeError {
    if e.is_timeout() {
        JudgeError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else {
        JudgeError::NetworkError(e.to_string())
    }
}

/// Map error statuses to [`JudgeError`]s, passing successful responses through.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
) -> Result<reqwest::Response, JudgeError> {
    let status = response.status().as_u16();
    match status {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                * 1000;
            Err(JudgeError::RateLimited {
                retry_after_ms: retry_after,
            })
        }
        401 | 403 => {
            let body = response.text().await.unwrap_or_default();
            Err(JudgeError::AuthenticationFailed(body))
        }
        404 => Err(JudgeError::ModelNotFound(model.to_string())),
        s if s >= 400 => {
            let body = response.text().await.unwrap_or_default();
            Err(JudgeError::ApiError {
                status,
                message: body,
            })
        }
        _ => Ok(response),
    }
}

pub(crate) fn parse_error(e: reqwest::Error) -> JudgeError {
    JudgeError::ApiError {
        status: 0,
        message: format!("failed to parse response: {e}"),
    }
}
