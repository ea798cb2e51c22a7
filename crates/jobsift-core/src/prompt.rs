//! Prompt construction.
//!
//! Each record yields a [`ClassificationRequest`]: the primary prompt
//! rendered from the configured template, plus a condensed fallback prompt
//! that carries only the columns most useful for classification.

use jobsift_types::InputRecord;
use jobsift_types::config::PromptSettings;
use serde_json::{Map, Value};

/// Placeholder that expands to the whole record as JSON.
pub const ROW_JSON_PLACEHOLDER: &str = "row_json";

/// Fallback slots and the column spellings tried for each, in order.
const FALLBACK_SLOTS: &[(&str, &[&str])] = &[
    ("Vacancy name", &["Vacancy name", "vacancy_name", "name"]),
    ("Company name", &["Company name", "company_name", "employer"]),
    (
        DESCRIPTION_SLOT,
        &[
            "Vacancy description",
            "vacancy_description",
            "Vacancy Description",
            "description",
        ],
    ),
    (
        "Core technologies",
        &["Core technologies", "core_technologies", "skills"],
    ),
    ("salary", &["salary"]),
    (
        "required_experience",
        &["required_experience", "experience_name"],
    ),
    ("location", &["location", "area"]),
];

const DESCRIPTION_SLOT: &str = "Vacancy description";

/// Everything needed to classify one record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    pub system: String,
    pub primary: String,
    pub fallback: Option<String>,
}

impl ClassificationRequest {
    /// Prompt candidates in the order they are tried.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallback.as_deref())
    }

    pub fn candidate_count(&self) -> usize {
        1 + usize::from(self.fallback.is_some())
    }
}

/// Builds prompts for records. Pure: no I/O, no state between calls.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system: String,
    template: String,
    description_cap: usize,
}

impl PromptBuilder {
    pub fn new(system: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            template: template.into(),
            description_cap: 2000,
        }
    }

    pub fn from_settings(settings: &PromptSettings) -> Self {
        Self::new(settings.system.clone(), settings.user_template.clone())
            .with_description_cap(settings.fallback_description_chars)
    }

    /// Character cap on the description in the fallback prompt.
    pub fn with_description_cap(mut self, chars: usize) -> Self {
        self.description_cap = chars;
        self
    }

    /// Primary prompt for `record`.
    pub fn build(&self, record: &InputRecord) -> String {
        render_template(&self.template, record)
    }

    /// Condensed prompt built from a fixed subset of columns.
    ///
    /// Returns `None` when the record has none of the known columns, since
    /// such a prompt would carry no vacancy data at all.
    pub fn build_fallback(&self, record: &InputRecord) -> Option<String> {
        let mut condensed = Map::new();
        let mut any = false;
        for (slot, columns) in FALLBACK_SLOTS {
            let mut value = record.first_non_empty(columns).unwrap_or_default().to_owned();
            any |= !value.is_empty();
            if *slot == DESCRIPTION_SLOT {
                value = truncate_chars(&value, self.description_cap);
            }
            condensed.insert((*slot).to_owned(), Value::String(value));
        }
        if !any {
            return None;
        }
        Some(format!(
            "Vacancy data (condensed JSON):\n{}\n\n\
Respond with a JSON object using the required fields only.",
            Value::Object(condensed)
        ))
    }

    pub fn request(&self, record: &InputRecord) -> ClassificationRequest {
        ClassificationRequest {
            system: self.system.clone(),
            primary: self.build(record),
            fallback: self.build_fallback(record),
        }
    }
}

/// Cut `text` to at most `cap` characters. A cut value is right-trimmed and
/// gets a `...` suffix.
pub fn truncate_chars(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        None => text.to_owned(),
        Some((byte_idx, _)) => format!("{}...", text[..byte_idx].trim_end()),
    }
}

/// Expand `{column}` and `{row_json}` placeholders.
///
/// Unknown columns render empty. `{{` and `}}` are literal braces, and a `{`
/// with no matching `}` is copied through unchanged.
pub fn render_template(template: &str, record: &InputRecord) -> String {
    let mut out = String::with_capacity(template.len());
    let mut row_json: Option<String> = None;
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix('}') {
            out.push('}');
            rest = after;
            continue;
        }

        let body = &tail[1..];
        match body.find(['{', '}']) {
            Some(end) if body[end..].starts_with('}') => {
                let name = &body[..end];
                if name == ROW_JSON_PLACEHOLDER {
                    let json = row_json.get_or_insert_with(|| record.to_json().to_string());
                    out.push_str(json);
                } else {
                    out.push_str(record.get(name).unwrap_or_default());
                }
                rest = &body[end + 1..];
            }
            _ => {
                out.push('{');
                rest = body;
            }
        }
    }
    out.push_str(rest);
    out
}
