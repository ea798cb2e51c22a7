//! Provider error types for jobsift-llm.
//!
//! All provider operations return [`Result<T>`] which uses [`ProviderError`]
//! as the error type. [`crate::retry::classify`] sorts these into the three
//! classes the classifier's retry loop cares about.

use thiserror::Error;

/// Errors that can occur when calling the classification endpoint.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The endpoint rejected the request or answered with an unexpected status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Authentication was rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The endpoint returned a rate-limit response (HTTP 429).
    ///
    /// `retry_after_ms` is only set when the response carried a usable hint
    /// in a header or the error body.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Server-suggested wait before retrying, in milliseconds.
        retry_after_ms: Option<u64>,
        /// Error text from the response body.
        message: String,
    },

    /// The requested model does not exist on the endpoint.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// A 200 response whose body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The request exceeded the configured timeout.
    #[error("timeout")]
    Timeout,

    /// Transport-level failure from reqwest.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    /// Map a reqwest failure, separating timeouts from other transport errors.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// HTTP status embedded in a [`RequestFailed`](Self::RequestFailed)
    /// message of the form `HTTP <code> ...`.
    pub fn http_status(&self) -> Option<u16> {
        let Self::RequestFailed(msg) = self else {
            return None;
        };
        msg.strip_prefix("HTTP ")?
            .split(|c: char| !c.is_ascii_digit())
            .next()?
            .parse()
            .ok()
    }
}

/// A convenience type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_rate_limited_uses_message() {
        let err = ProviderError::RateLimited {
            retry_after_ms: Some(3000),
            message: "Rate limit reached. Please try again in 3s.".into(),
        };
        assert_eq!(
            err.to_string(),
            "rate limited: Rate limit reached. Please try again in 3s."
        );
    }

    #[test]
    fn display_model_not_found() {
        let err = ProviderError::ModelNotFound("gpt-5-mini".into());
        assert_eq!(err.to_string(), "model not found: gpt-5-mini");
    }

    #[test]
    fn display_timeout() {
        assert_eq!(ProviderError::Timeout.to_string(), "timeout");
    }

    #[test]
    fn http_status_parsed_from_request_failed() {
        let err = ProviderError::RequestFailed("HTTP 503 Service Unavailable: busy".into());
        assert_eq!(err.http_status(), Some(503));

        let err = ProviderError::RequestFailed("quota exceeded".into());
        assert_eq!(err.http_status(), None);

        assert_eq!(ProviderError::Timeout.http_status(), None);
    }

    #[test]
    fn json_error_from_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: ProviderError = serde_err.into();
        assert!(err.to_string().starts_with("json error:"));
    }
}
