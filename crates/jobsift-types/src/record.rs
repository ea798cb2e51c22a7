//! Input and output row types.
//!
//! An [`InputRecord`] is schema-on-read: whatever columns the source CSV
//! header declares, in header order. An [`OutputRecord`] is the fixed
//! seven-column contract written to the output CSV.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One job-posting row keyed by column name, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputRecord {
    columns: IndexMap<String, String>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record by zipping a header with one row of cells.
    ///
    /// Missing trailing cells become empty strings; surplus cells are
    /// dropped. Returns the record and the number of dropped cells.
    pub fn from_row<'a, I>(header: &[String], cells: I) -> (Self, usize)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut cells = cells.into_iter();
        let columns = header
            .iter()
            .map(|name| (name.clone(), cells.next().unwrap_or_default().to_owned()))
            .collect();
        let dropped = cells.count();
        (Self { columns }, dropped)
    }

    /// Value of `column`, exact match.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }

    /// First non-blank value among `candidates`, tried in order.
    pub fn first_non_empty(&self, candidates: &[&str]) -> Option<&str> {
        candidates
            .iter()
            .filter_map(|c| self.get(c))
            .find(|v| !v.trim().is_empty())
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Cells laid out in `header` order; unknown columns render empty.
    pub fn cells_for<'a>(&'a self, header: &'a [String]) -> impl Iterator<Item = &'a str> {
        header.iter().map(|h| self.get(h).unwrap_or_default())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The whole record as a JSON object, preserving column order.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.columns
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InputRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            columns: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The seven output columns, in the order they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputField {
    CompanyName,
    SummarizedDescription,
    TechnologyStack,
    FieldType,
    Salary,
    Location,
    YearsRequired,
}

impl OutputField {
    pub const ALL: [OutputField; 7] = [
        OutputField::CompanyName,
        OutputField::SummarizedDescription,
        OutputField::TechnologyStack,
        OutputField::FieldType,
        OutputField::Salary,
        OutputField::Location,
        OutputField::YearsRequired,
    ];

    /// CSV header name for this field.
    pub fn column(self) -> &'static str {
        match self {
            OutputField::CompanyName => "company_name",
            OutputField::SummarizedDescription => "summarized_description",
            OutputField::TechnologyStack => "technology_stack",
            OutputField::FieldType => "field_type",
            OutputField::Salary => "salary",
            OutputField::Location => "location",
            OutputField::YearsRequired => "years_required",
        }
    }

    /// Header row for the output CSV.
    pub fn header() -> [&'static str; 7] {
        Self::ALL.map(Self::column)
    }
}

/// One normalized output row. Every field is always present; unresolved
/// fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub company_name: String,
    pub summarized_description: String,
    pub technology_stack: String,
    pub field_type: String,
    pub salary: String,
    pub location: String,
    pub years_required: String,
}

impl OutputRecord {
    pub fn get(&self, field: OutputField) -> &str {
        match field {
            OutputField::CompanyName => &self.company_name,
            OutputField::SummarizedDescription => &self.summarized_description,
            OutputField::TechnologyStack => &self.technology_stack,
            OutputField::FieldType => &self.field_type,
            OutputField::Salary => &self.salary,
            OutputField::Location => &self.location,
            OutputField::YearsRequired => &self.years_required,
        }
    }

    pub fn set(&mut self, field: OutputField, value: String) {
        let slot = match field {
            OutputField::CompanyName => &mut self.company_name,
            OutputField::SummarizedDescription => &mut self.summarized_description,
            OutputField::TechnologyStack => &mut self.technology_stack,
            OutputField::FieldType => &mut self.field_type,
            OutputField::Salary => &mut self.salary,
            OutputField::Location => &mut self.location,
            OutputField::YearsRequired => &mut self.years_required,
        };
        *slot = value;
    }

    /// True when no field resolved to a value.
    pub fn is_blank(&self) -> bool {
        OutputField::ALL.iter().all(|f| self.get(*f).is_empty())
    }
}
