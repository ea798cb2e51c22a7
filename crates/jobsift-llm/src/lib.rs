//! Chat completion client for jobsift.
//!
//! - [`Provider`] trait defines the single call the classifier makes
//! - [`OpenAiCompatProvider`] implements it for any OpenAI-compatible API
//! - [`retry`] classifies failures and computes backoff delays
//! - [`LlmProviderConfig`] describes how to reach the endpoint

pub mod config;
pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod retry;
pub mod types;

pub use config::LlmProviderConfig;
pub use error::{ProviderError, Result};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::Provider;
pub use retry::{BackoffPolicy, ErrorClass};
pub use types::{ChatMessage, ChatRequest, ChatResponse, RateLimitInfo, ResponseFormat, Usage};
