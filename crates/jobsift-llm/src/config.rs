//! Connection settings for an OpenAI-compatible endpoint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for one chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Label used in log events (e.g. "openai").
    pub name: String,

    /// Base URL, e.g. "https://api.openai.com/v1".
    pub base_url: String,

    /// Extra HTTP headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request timeout in seconds. Defaults to 120.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Default request timeout when `timeout_secs` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

impl LlmProviderConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}
