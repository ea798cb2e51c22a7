//! The [`Provider`] trait for chat completions.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};

/// A backend that can execute one chat completion request.
///
/// The production implementation is
/// [`OpenAiCompatProvider`](crate::openai_compat::OpenAiCompatProvider).
/// Tests substitute scripted implementations.
///
/// ```rust,ignore
/// use jobsift_llm::{ChatMessage, ChatRequest, Provider};
///
/// async fn ask(provider: &dyn Provider) -> jobsift_llm::Result<String> {
///     let request = ChatRequest::new("gpt-5-mini", vec![ChatMessage::user("{}")]);
///     let response = provider.complete(&request).await?;
///     Ok(response.first_content().unwrap_or_default().to_owned())
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider label used in log events.
    fn name(&self) -> &str;

    /// Execute a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`](crate::error::ProviderError) for transport
    /// failures, non-success statuses and undecodable bodies.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}
