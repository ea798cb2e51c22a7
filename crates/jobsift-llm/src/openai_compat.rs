//! OpenAI-compatible provider implementation.
//!
//! [`OpenAiCompatProvider`] POSTs to `{base_url}/chat/completions` and maps
//! non-success statuses onto [`ProviderError`] variants. Any endpoint that
//! speaks the OpenAI chat completion format works by changing `base_url`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::LlmProviderConfig;
use crate::error::{ProviderError, Result};
use crate::provider::Provider;
use crate::types::{ChatRequest, ChatResponse, RateLimitInfo};

/// Chat completion client for OpenAI-compatible endpoints.
///
/// The key is resolved by the caller; this type never reads the environment.
pub struct OpenAiCompatProvider {
    config: LlmProviderConfig,
    http: reqwest::Client,
    api_key: String,
}

impl OpenAiCompatProvider {
    /// Create a provider that authenticates with `api_key`.
    pub fn with_api_key(config: LlmProviderConfig, api_key: String) -> Result<Self> {
        let http = build_client(&config)?;
        Ok(Self {
            config,
            http,
            api_key,
        })
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

fn build_client(config: &LlmProviderConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs()))
        .build()
        .map_err(ProviderError::Http)
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.completions_url();

        debug!(
            provider = %self.config.name,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let mut req = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");

        for (k, v) in &self.config.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req
            .json(request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;
        let status = response.status();

        if !status.is_success() {
            if status.as_u16() == 429 {
                let header_ms = parse_retry_after_header(response.headers());
                let body = response.text().await.unwrap_or_default();

                // Exhausted quota or billing problems also arrive as 429 but
                // never clear up by waiting.
                if is_quota_exhausted(&body) {
                    let msg = extract_error_message(&body)
                        .unwrap_or_else(|| "quota exhausted or spending limit reached".into());
                    warn!(provider = %self.config.name, "quota exhausted (not retryable)");
                    return Err(ProviderError::RequestFailed(msg));
                }

                let retry_after_ms = header_ms.or_else(|| parse_retry_after_ms(&body));
                let message = extract_error_message(&body).unwrap_or(body);
                warn!(
                    provider = %self.config.name,
                    retry_after_ms = ?retry_after_ms,
                    message = %message,
                    "rate limited"
                );
                return Err(ProviderError::RateLimited {
                    retry_after_ms,
                    message,
                });
            }

            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ProviderError::AuthFailed(body));
            }

            if status.as_u16() == 404 {
                return Err(ProviderError::ModelNotFound(format!(
                    "model '{}': {}",
                    request.model, body
                )));
            }

            return Err(ProviderError::RequestFailed(format!(
                "HTTP {status}: {body}"
            )));
        }

        let rate_limit = rate_limit_info(response.headers());
        let mut chat_response: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::InvalidResponse(format!("failed to parse response: {e}"))
            }
        })?;
        chat_response.rate_limit = rate_limit;

        debug!(
            provider = %self.config.name,
            model = %chat_response.model,
            choices = chat_response.choices.len(),
            remaining_requests = ?chat_response.rate_limit.remaining_requests,
            remaining_tokens = ?chat_response.rate_limit.remaining_tokens,
            "chat completion response received"
        );

        Ok(chat_response)
    }
}

/// True when a 429 body signals a billing or quota problem rather than a
/// short-lived rate limit.
fn is_quota_exhausted(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("insufficient_quota")
        || lower.contains("quota exceeded")
        || lower.contains("exceeded your current quota")
        || lower.contains("spending limit")
        || lower.contains("billing")
}

/// Pull `error.message` (or a bare `error` string) out of a JSON error body.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error").and_then(|v| {
        v.get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .or_else(|| v.as_str().map(String::from))
    })
}

/// Numeric `Retry-After` (or `x-ratelimit-reset-after`) header, in ms.
/// HTTP-date values are ignored.
fn parse_retry_after_header(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let value = headers
        .get("retry-after")
        .or_else(|| headers.get("x-ratelimit-reset-after"))
        .and_then(|v| v.to_str().ok())?;

    let secs = value.trim().parse::<f64>().ok()?;
    secs.is_finite().then(|| (secs * 1000.0).max(0.0) as u64)
}

/// `retry_after_ms` or `retry_after` (seconds) from a JSON error body.
fn parse_retry_after_ms(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("retry_after_ms").and_then(|v| v.as_u64()).or_else(|| {
        value
            .get("retry_after")
            .and_then(|v| v.as_f64())
            .map(|secs| (secs * 1000.0) as u64)
    })
}

fn rate_limit_info(headers: &reqwest::header::HeaderMap) -> RateLimitInfo {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    RateLimitInfo {
        remaining_requests: get("x-ratelimit-remaining-requests"),
        remaining_tokens: get("x-ratelimit-remaining-tokens"),
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.config.name)
            .field("base_url", &self.config.base_url)
            .field("api_key", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn test_config() -> LlmProviderConfig {
        LlmProviderConfig {
            name: "test-provider".into(),
            base_url: "https://api.example.com/v1".into(),
            headers: Default::default(),
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn completions_url_strips_trailing_slash() {
        let mut config = test_config();
        config.base_url = "https://api.example.com/v1/".into();
        let provider = OpenAiCompatProvider::with_api_key(config, "sk-test".into()).unwrap();
        assert_eq!(
            provider.completions_url(),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn debug_hides_api_key() {
        let provider =
            OpenAiCompatProvider::with_api_key(test_config(), "sk-secret-key".into()).unwrap();
        let debug_str = format!("{provider:?}");
        assert!(!debug_str.contains("sk-secret-key"));
        assert!(debug_str.contains("***"));
    }

    #[test]
    fn retry_after_header_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));
        assert_eq!(parse_retry_after_header(&headers), Some(3000));

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-reset-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after_header(&headers), Some(1500));
    }

    #[test]
    fn retry_after_header_http_date_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after_header(&headers), None);
    }

    #[test]
    fn retry_after_from_body() {
        assert_eq!(parse_retry_after_ms(r#"{"retry_after_ms": 2500}"#), Some(2500));
        assert_eq!(parse_retry_after_ms(r#"{"retry_after": 3.5}"#), Some(3500));
        assert_eq!(parse_retry_after_ms("not json"), None);
    }

    #[test]
    fn quota_exhaustion_detected() {
        assert!(is_quota_exhausted(
            r#"{"error": {"code": "insufficient_quota", "message": "You exceeded your current quota"}}"#
        ));
        assert!(!is_quota_exhausted(
            r#"{"error": {"message": "Rate limit reached for requests. Please try again in 20s."}}"#
        ));
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "slow down"}}"#).as_deref(),
            Some("slow down")
        );
        assert_eq!(
            extract_error_message(r#"{"error": "slow down"}"#).as_deref(),
            Some("slow down")
        );
        assert_eq!(extract_error_message("plain text"), None);
    }

    #[test]
    fn rate_limit_headers_captured() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining-tokens", HeaderValue::from_static("149000"));
        let info = rate_limit_info(&headers);
        assert_eq!(info.remaining_tokens.as_deref(), Some("149000"));
        assert_eq!(info.remaining_requests, None);
    }
}
