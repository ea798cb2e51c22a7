//! Configuration schema.
//!
//! Every section and field has a default, so an empty JSON object (`{}`) is a
//! valid configuration. Fields accept both `snake_case` and `camelCase` keys.
//! Unknown fields are ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{JobsiftError, Result};
use crate::secret::SecretString;

/// Fields the classifier is asked to return. Kept in sync with
/// [`OutputField`](crate::record::OutputField) column names.
const REQUIRED_FIELDS: &str = "company_name, summarized_description, technology_stack, \
field_type, salary, location, years_required";

/// Default system instructions sent with every request.
pub fn default_system_prompt() -> String {
    format!(
        "You are a strict classifier. Return only valid JSON with fields: {REQUIRED_FIELDS}. \
summarized_description must be written in the same language as the vacancy text. \
field type can be: {{Game Development, Rendering & Graphics, Embedded & Firmware, \
Backend & High-Load Services, Browsers & Web Engines, Frontend, \
Operating Systems & Toolchains, Robotics & Computer Vision & AI, Video & Media, \
Desktop Applications & CAD, Scientific Computing & HPC, Security & Reverse Engineering}}"
    )
}

/// Default user prompt template. `{row_json}` expands to the full record.
pub fn default_user_template() -> String {
    "Vacancy data (CSV row JSON):\n{row_json}\n\n\
Respond with a JSON object using the required fields only."
        .into()
}

// ── Root ─────────────────────────────────────────────────────────────────

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where and how to reach the classification service.
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Model parameters and retry budget.
    #[serde(default)]
    pub classifier: ClassifierSettings,

    /// Prompt text and fallback sizing.
    #[serde(default)]
    pub prompts: PromptSettings,

    /// Queue behaviour and pacing.
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

impl Config {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(JobsiftError::ConfigInvalid {
                reason: reason.into(),
            })
        };

        if self.provider.base_url.trim().is_empty() {
            return invalid("provider.base_url must not be empty");
        }
        if self.classifier.model.trim().is_empty() {
            return invalid("classifier.model must not be empty");
        }
        if self.classifier.max_attempts == 0 {
            return invalid("classifier.max_attempts must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.classifier.temperature) {
            return invalid("classifier.temperature must be within 0.0..=2.0");
        }
        if !self.classifier.rate_limit_fallback_secs.is_finite()
            || self.classifier.rate_limit_fallback_secs < 0.0
        {
            return invalid("classifier.rate_limit_fallback_secs must be a non-negative number");
        }
        if !self.classifier.transient_backoff_secs.is_finite()
            || self.classifier.transient_backoff_secs < 0.0
        {
            return invalid("classifier.transient_backoff_secs must be a non-negative number");
        }
        if !self.pipeline.delay_secs.is_finite() || self.pipeline.delay_secs < 0.0 {
            return invalid("pipeline.delay_secs must be a non-negative number");
        }
        if self.prompts.fallback_description_chars == 0 {
            return invalid("prompts.fallback_description_chars must be at least 1");
        }
        Ok(())
    }

    /// Resolve the API key: explicit value > environment variable.
    pub fn resolve_api_key(&self) -> Result<SecretString> {
        if !self.provider.api_key.is_empty() {
            return Ok(self.provider.api_key.clone());
        }
        SecretString::from_env(&self.provider.api_key_env).ok_or_else(|| {
            JobsiftError::MissingCredential {
                env_var: self.provider.api_key_env.clone(),
            }
        })
    }
}

// ── Provider ─────────────────────────────────────────────────────────────

/// Connection settings for the OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Label used in log events.
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Base URL, e.g. `https://api.openai.com/v1`.
    #[serde(default = "default_base_url", alias = "baseUrl")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env", alias = "apiKeyEnv")]
    pub api_key_env: String,

    /// Explicit API key. Takes precedence over `api_key_env`.
    #[serde(default, alias = "apiKey")]
    pub api_key: SecretString,

    /// Extra headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Per-request network timeout.
    #[serde(default = "default_timeout_secs", alias = "timeoutSecs")]
    pub timeout_secs: u64,
}

fn default_provider_name() -> String {
    "openai".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            api_key: SecretString::default(),
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Classifier ───────────────────────────────────────────────────────────

/// Model parameters and the per-candidate retry budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Cap on the reply size, in tokens.
    #[serde(default = "default_max_tokens", alias = "maxTokens")]
    pub max_tokens: u32,

    /// Calls per prompt candidate before escalating.
    #[serde(default = "default_max_attempts", alias = "maxAttempts")]
    pub max_attempts: u32,

    /// Wait used when a rate-limit carries no usable retry hint.
    #[serde(
        default = "default_rate_limit_fallback_secs",
        alias = "rateLimitFallbackSecs"
    )]
    pub rate_limit_fallback_secs: f64,

    /// Transient errors wait `transient_backoff_secs * attempt`.
    #[serde(
        default = "default_transient_backoff_secs",
        alias = "transientBackoffSecs"
    )]
    pub transient_backoff_secs: f64,
}

fn default_model() -> String {
    "gpt-5-mini".into()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_max_attempts() -> u32 {
    3
}
fn default_rate_limit_fallback_secs() -> f64 {
    20.0
}
fn default_transient_backoff_secs() -> f64 {
    1.5
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_attempts: default_max_attempts(),
            rate_limit_fallback_secs: default_rate_limit_fallback_secs(),
            transient_backoff_secs: default_transient_backoff_secs(),
        }
    }
}

// ── Prompts ──────────────────────────────────────────────────────────────

/// Prompt text. The template supports `{row_json}` and `{<column name>}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSettings {
    #[serde(default = "default_system_prompt")]
    pub system: String,

    #[serde(default = "default_user_template", alias = "userTemplate")]
    pub user_template: String,

    /// Character cap on the description in the fallback prompt.
    #[serde(
        default = "default_fallback_description_chars",
        alias = "fallbackDescriptionChars"
    )]
    pub fallback_description_chars: usize,
}

fn default_fallback_description_chars() -> usize {
    2000
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            system: default_system_prompt(),
            user_template: default_user_template(),
            fallback_description_chars: default_fallback_description_chars(),
        }
    }
}

// ── Pipeline ─────────────────────────────────────────────────────────────

/// How processed rows leave the work queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Remove each row from the input file once its output is durable.
    #[default]
    Destructive,
    /// Leave the input file untouched and advance an in-memory cursor.
    Cursor,
}

/// Queue behaviour and pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Pause after each record, in seconds.
    #[serde(default = "default_delay_secs", alias = "delaySecs")]
    pub delay_secs: f64,

    /// Stop after this many rows.
    #[serde(default)]
    pub limit: Option<usize>,

    #[serde(default, alias = "queueMode")]
    pub queue_mode: QueueMode,

    /// JSONL file recording rows that fell back to record-only output.
    #[serde(default, alias = "failuresPath")]
    pub failures_path: Option<String>,
}

fn default_delay_secs() -> f64 {
    7.0
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            limit: None,
            queue_mode: QueueMode::default(),
            failures_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.provider.base_url, "https://api.openai.com/v1");
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.provider.timeout_secs, 120);
        assert_eq!(config.classifier.model, "gpt-5-mini");
        assert_eq!(config.classifier.max_attempts, 3);
        assert_eq!(config.classifier.max_tokens, 1024);
        assert!((config.classifier.rate_limit_fallback_secs - 20.0).abs() < f64::EPSILON);
        assert!((config.pipeline.delay_secs - 7.0).abs() < f64::EPSILON);
        assert_eq!(config.pipeline.queue_mode, QueueMode::Destructive);
        assert_eq!(config.prompts.fallback_description_chars, 2000);
        assert!(config.prompts.user_template.contains("{row_json}"));
        config.validate().unwrap();
    }

    #[test]
    fn camel_case_aliases_accepted() {
        let json = r#"{
            "provider": {"baseUrl": "http://localhost:8080/v1", "apiKeyEnv": "LOCAL_KEY"},
            "classifier": {"maxAttempts": 5, "maxTokens": 256},
            "pipeline": {"delaySecs": 0.5, "queueMode": "cursor", "failuresPath": "f.jsonl"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.provider.base_url, "http://localhost:8080/v1");
        assert_eq!(config.provider.api_key_env, "LOCAL_KEY");
        assert_eq!(config.classifier.max_attempts, 5);
        assert_eq!(config.classifier.max_tokens, 256);
        assert_eq!(config.pipeline.queue_mode, QueueMode::Cursor);
        assert_eq!(config.pipeline.failures_path.as_deref(), Some("f.jsonl"));
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.classifier.max_attempts = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn validate_rejects_negative_delay() {
        let mut config = Config::default();
        config.pipeline.delay_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_api_key_wins() {
        let mut config = Config::default();
        config.provider.api_key = "sk-explicit".into();
        config.provider.api_key_env = "JOBSIFT_TEST_UNSET_KEY_0001".into();
        assert_eq!(config.resolve_api_key().unwrap().expose(), "sk-explicit");
    }

    #[test]
    fn missing_api_key_is_setup_error() {
        let mut config = Config::default();
        config.provider.api_key_env = "JOBSIFT_TEST_UNSET_KEY_0002".into();
        let err = config.resolve_api_key().unwrap_err();
        assert!(matches!(err, JobsiftError::MissingCredential { .. }));
    }

    #[test]
    fn serialized_config_hides_api_key() {
        let mut config = Config::default();
        config.provider.api_key = "sk-do-not-print".into();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-do-not-print"));
    }

    #[test]
    fn default_system_prompt_lists_output_fields() {
        let system = default_system_prompt();
        for field in crate::record::OutputField::header() {
            assert!(system.contains(field), "missing {field}");
        }
    }
}
