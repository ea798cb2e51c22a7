//! Error classification and backoff delays for provider calls.
//!
//! The classifier's retry loop never inspects [`ProviderError`] variants
//! directly. It asks [`classify`] which class an error belongs to and
//! [`BackoffPolicy`] how long to wait.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::ProviderError;

/// How the retry loop should react to a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Wait for the server-suggested delay, then retry.
    RateLimited,
    /// Back off linearly, then retry.
    Transient,
    /// Do not retry this payload.
    Permanent,
}

/// Sort a provider error into its retry class.
pub fn classify(err: &ProviderError) -> ErrorClass {
    match err {
        ProviderError::RateLimited { .. } => ErrorClass::RateLimited,
        ProviderError::Timeout | ProviderError::Http(_) => ErrorClass::Transient,
        ProviderError::RequestFailed(_) => match err.http_status() {
            Some(408 | 409) | Some(500..=599) => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        },
        ProviderError::AuthFailed(_)
        | ProviderError::ModelNotFound(_)
        | ProviderError::InvalidResponse(_)
        | ProviderError::Json(_) => ErrorClass::Permanent,
    }
}

static RETRY_HINT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:try again|retry(?: after)?) in (\d+(?:\.\d+)?)\s*(ms|milliseconds?|s|secs?|seconds?)\b",
    )
    .ok()
});

/// Find a "try again in 20s" / "retry in 500ms" style hint in error text.
pub fn parse_retry_hint(text: &str) -> Option<Duration> {
    let caps = RETRY_HINT.as_ref()?.captures(text)?;
    let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let secs = if unit.starts_with('m') {
        amount / 1000.0
    } else {
        amount
    };
    Duration::try_from_secs_f64(secs).ok()
}

/// Delays between attempts on the same prompt candidate.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Used when a rate limit carries no header, body or text hint.
    pub rate_limit_fallback: Duration,
    /// Transient errors wait `transient_step * attempt`.
    pub transient_step: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            rate_limit_fallback: Duration::from_secs(20),
            transient_step: Duration::from_millis(1500),
        }
    }
}

impl BackoffPolicy {
    /// Server hint > text hint > fixed fallback.
    pub fn rate_limit_delay(&self, err: &ProviderError) -> Duration {
        if let ProviderError::RateLimited {
            retry_after_ms: Some(ms),
            ..
        } = err
        {
            return Duration::from_millis(*ms);
        }
        parse_retry_hint(&err.to_string()).unwrap_or(self.rate_limit_fallback)
    }

    /// Linear backoff for attempt `attempt` (1-based).
    pub fn transient_delay(&self, attempt: u32) -> Duration {
        self.transient_step.saturating_mul(attempt)
    }
}
