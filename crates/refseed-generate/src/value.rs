use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Storable value for a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// Generated value: the stored primary form plus an optional human-readable
/// counterpart (e.g. the plaintext behind a password hash).
///
/// Only `primary` takes part in uniqueness, references and rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedValue {
    pub primary: Value,
    pub display: Option<String>,
}

/// One generated row keyed by column name.
pub type Row = HashMap<String, GeneratedValue>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) | Value::Uuid(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// SQL literal used by row-insert statements.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(value) => value.to_string(),
            Value::Text(_) | Value::Uuid(_) | Value::Date(_) | Value::Timestamp(_) => {
                format!("'{}'", self.to_string().replace('\'', "''"))
            }
        }
    }

    /// Field encoding for COPY ... FROM stdin text format.
    pub fn to_copy_field(&self) -> String {
        match self {
            Value::Null => "\\N".to_string(),
            Value::Bool(true) => "t".to_string(),
            Value::Bool(false) => "f".to_string(),
            other => escape_copy(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Text(value) | Value::Uuid(value) => f.write_str(value),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl GeneratedValue {
    pub fn new(primary: Value) -> Self {
        Self {
            primary,
            display: None,
        }
    }

    pub fn with_display(primary: Value, display: impl Into<String>) -> Self {
        Self {
            primary,
            display: Some(display.into()),
        }
    }

    /// Text for reports: the display payload when present, otherwise the primary value.
    pub fn display_text(&self) -> String {
        self.display
            .clone()
            .unwrap_or_else(|| self.primary.to_string())
    }
}

impl From<Value> for GeneratedValue {
    fn from(value: Value) -> Self {
        GeneratedValue::new(value)
    }
}

fn escape_copy(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}
