//! Classifier client: retries, backoff and prompt fallback.
//!
//! [`Classifier::classify`] walks the candidates of a
//! [`ClassificationRequest`] in order. Each candidate gets up to
//! `max_attempts` calls:
//!
//! | outcome                 | action                                       |
//! |-------------------------|----------------------------------------------|
//! | reply parses to object  | return immediately                           |
//! | reply does not parse    | abandon candidate, escalate                  |
//! | rate limited            | wait retry hint, retry same candidate        |
//! | transient failure       | wait `step * attempt`, retry same candidate  |
//! | permanent failure       | fail the record                              |
//!
//! Only an unusable reply moves on to the next candidate. A rate limit or
//! transient failure on the last attempt fails the record, with no wait.

use std::sync::Arc;
use std::time::Duration;

use jobsift_llm::retry::{BackoffPolicy, ErrorClass, classify};
use jobsift_llm::{ChatMessage, ChatRequest, Provider, ResponseFormat};
use jobsift_types::config::ClassifierSettings;
use tracing::{debug, info, warn};

use crate::error::ClassifyError;
use crate::prompt::ClassificationRequest;
use crate::reply::{ParsedReply, parse_reply};

/// Model parameters and retry budget for [`Classifier`].
#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Calls per candidate. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
}

impl ClassifierOptions {
    pub fn from_settings(settings: &ClassifierSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: Some(settings.temperature),
            max_tokens: Some(settings.max_tokens),
            max_attempts: settings.max_attempts,
            backoff: BackoffPolicy {
                rate_limit_fallback: secs(settings.rate_limit_fallback_secs),
                transient_step: secs(settings.transient_backoff_secs),
            },
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

/// A successful classification.
#[derive(Debug, Clone)]
pub struct Classification {
    pub reply: ParsedReply,
    /// Reply text as received.
    pub raw: String,
    /// Zero-based index of the candidate that produced the reply.
    pub candidate: usize,
    /// Calls spent on that candidate.
    pub attempts: u32,
}

/// Sends classification requests through a [`Provider`].
pub struct Classifier {
    provider: Arc<dyn Provider>,
    options: ClassifierOptions,
}

impl Classifier {
    pub fn new(provider: Arc<dyn Provider>, options: ClassifierOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }

    fn chat_request(&self, system: &str, prompt: &str) -> ChatRequest {
        let mut chat = ChatRequest::new(
            self.options.model.clone(),
            vec![ChatMessage::system(system), ChatMessage::user(prompt)],
        );
        chat.temperature = self.options.temperature;
        chat.max_tokens = self.options.max_tokens;
        chat.response_format = Some(ResponseFormat::json_object());
        chat
    }

    /// Classify one record's request.
    ///
    /// # Errors
    ///
    /// [`ClassifyError::Exhausted`] once every candidate has been abandoned.
    pub async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<Classification, ClassifyError> {
        let max_attempts = self.options.max_attempts.max(1);
        let candidates = request.candidate_count();
        let mut last_reply: Option<String> = None;
        let mut last_error = String::from("no attempt made");

        for (candidate, prompt) in request.candidates().enumerate() {
            let chat = self.chat_request(&request.system, prompt);
            let mut attempt = 0;

            while attempt < max_attempts {
                attempt += 1;
                debug!(
                    provider = %self.provider.name(),
                    candidate,
                    attempt,
                    "requesting classification"
                );

                let err = match self.provider.complete(&chat).await {
                    Ok(response) => {
                        if let Some(usage) = &response.usage {
                            info!(
                                prompt_tokens = usage.prompt_tokens,
                                completion_tokens = usage.completion_tokens,
                                total_tokens = usage.total_tokens,
                                "token usage"
                            );
                        }
                        if let Some(remaining) = &response.rate_limit.remaining_tokens {
                            debug!(remaining_tokens = %remaining, "rate limit remaining");
                        }

                        let raw = response.first_content().unwrap_or_default().to_owned();
                        debug!(candidate, reply = %raw, "raw reply");

                        match parse_reply(&raw) {
                            Ok(reply) => {
                                return Ok(Classification {
                                    reply,
                                    raw,
                                    candidate,
                                    attempts: attempt,
                                });
                            }
                            Err(e) => {
                                warn!(candidate, error = %e, "unusable reply, abandoning prompt");
                                last_error = e.to_string();
                                last_reply = Some(raw);
                                break;
                            }
                        }
                    }
                    Err(err) => err,
                };

                let delay = match classify(&err) {
                    ErrorClass::Permanent => None,
                    ErrorClass::RateLimited => Some(self.options.backoff.rate_limit_delay(&err)),
                    ErrorClass::Transient => Some(self.options.backoff.transient_delay(attempt)),
                };

                let Some(delay) = delay.filter(|_| attempt < max_attempts) else {
                    warn!(candidate, attempt, error = %err, "request failed, giving up on record");
                    return Err(ClassifyError::Exhausted {
                        candidates: candidate + 1,
                        last_reply,
                        last_error: err.to_string(),
                    });
                };

                warn!(
                    candidate,
                    attempt,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            if candidate + 1 < candidates {
                info!(candidate, "escalating to fallback prompt");
            }
        }

        Err(ClassifyError::Exhausted {
            candidates,
            last_reply,
            last_error,
        })
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .finish()
    }
}
