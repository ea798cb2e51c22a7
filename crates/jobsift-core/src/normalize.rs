//! Mapping loosely-shaped classifier replies onto [`OutputRecord`].
//!
//! Each output field has two ordered key lists: one searched in the reply,
//! one searched in the source record when the reply has nothing usable.
//! Keys match exactly first, then by [`normalize_key`], so `Company_Name`,
//! `company name` and `companyname` are the same key.

use std::collections::HashMap;

use jobsift_types::{InputRecord, OutputField, OutputRecord};
use serde_json::Value;

use crate::reply::ParsedReply;

struct FieldKeys {
    field: OutputField,
    reply: &'static [&'static str],
    record: &'static [&'static str],
}

const FIELD_KEYS: [FieldKeys; 7] = [
    FieldKeys {
        field: OutputField::CompanyName,
        reply: &["company_name", "Company Name", "company", "employer"],
        record: &["Company name", "company_name", "employer", "Vacancy company"],
    },
    FieldKeys {
        field: OutputField::SummarizedDescription,
        reply: &[
            "summarized_description",
            "summary",
            "summarized description",
            "description",
        ],
        record: &["Vacancy description", "vacancy_description", "description"],
    },
    FieldKeys {
        field: OutputField::TechnologyStack,
        reply: &[
            "technology_stack",
            "unified technology stack",
            "tech_stack",
            "technologies",
            "Core technologies",
        ],
        record: &["Core technologies", "core_technologies", "skills"],
    },
    FieldKeys {
        field: OutputField::FieldType,
        reply: &["field_type", "field", "category"],
        record: &["field_type", "field type"],
    },
    FieldKeys {
        field: OutputField::Salary,
        reply: &["salary"],
        record: &["salary"],
    },
    FieldKeys {
        field: OutputField::Location,
        reply: &["location", "city", "area"],
        record: &["location", "area", "city"],
    },
    FieldKeys {
        field: OutputField::YearsRequired,
        reply: &[
            "years_required",
            "years of experience required",
            "years_of_experience",
            "experience",
            "required_experience",
        ],
        record: &["required_experience", "experience_name", "experience"],
    },
];

/// Lowercase with whitespace and underscores removed.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Tolerant key lookup over `(key, value)` pairs.
struct KeyIndex<'a, V> {
    exact: HashMap<&'a str, V>,
    normalized: HashMap<String, V>,
}

impl<'a, V: Copy> KeyIndex<'a, V> {
    fn new(pairs: impl Iterator<Item = (&'a str, V)>) -> Self {
        let mut exact = HashMap::new();
        let mut normalized = HashMap::new();
        for (key, value) in pairs {
            exact.insert(key, value);
            normalized.entry(normalize_key(key)).or_insert(value);
        }
        Self { exact, normalized }
    }

    /// First key whose value `render` accepts. Per key: exact, then
    /// normalized.
    fn find(&self, keys: &[&str], render: impl Fn(V) -> Option<String>) -> Option<String> {
        keys.iter().find_map(|key| {
            self.exact
                .get(*key)
                .and_then(|v| render(*v))
                .or_else(|| {
                    self.normalized
                        .get(&normalize_key(key))
                        .and_then(|v| render(*v))
                })
        })
    }
}

/// Render a reply value as a cell. `null`, blank strings and empty
/// containers count as absent.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_blank(s),
        Value::Bool(_) | Value::Number(_) => Some(value.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => non_blank(s),
                    Value::Null => None,
                    other => render_value(other),
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Object(map) => (!map.is_empty()).then(|| value.to_string()),
    }
}

fn non_blank(s: &str) -> Option<String> {
    (!s.trim().is_empty()).then(|| s.to_owned())
}

/// `from X to Y CUR` built from split salary columns.
fn compose_salary(lookup: impl Fn(&[&str]) -> Option<String>) -> Option<String> {
    let from = lookup(&["salary_from"]);
    let to = lookup(&["salary_to"]);
    if from.is_none() && to.is_none() {
        return None;
    }
    let mut parts = Vec::new();
    if let Some(from) = from {
        parts.push(format!("from {from}"));
    }
    if let Some(to) = to {
        parts.push(format!("to {to}"));
    }
    if let Some(currency) = lookup(&["salary_currency"]) {
        parts.push(currency);
    }
    Some(parts.join(" "))
}

/// Build the output row for `record`.
///
/// Total: never fails, and every field is present. Pass an empty reply to
/// get the record-only fallback row.
pub fn normalize(reply: &ParsedReply, record: &InputRecord) -> OutputRecord {
    let reply_index = KeyIndex::new(reply.iter().map(|(k, v)| (k.as_str(), v)));
    let record_index = KeyIndex::new(record.iter());

    let from_reply = |keys: &[&str]| reply_index.find(keys, render_value);
    let from_record = |keys: &[&str]| record_index.find(keys, non_blank);

    let mut out = OutputRecord::default();
    for keys in &FIELD_KEYS {
        let mut value = from_reply(keys.reply);
        if value.is_none() && keys.field == OutputField::Salary {
            value = compose_salary(from_reply);
        }
        if value.is_none() {
            value = from_record(keys.record);
        }
        if value.is_none() && keys.field == OutputField::Salary {
            value = compose_salary(from_record);
        }
        out.set(keys.field, value.unwrap_or_default());
    }
    out
}
