use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row from the query service: a JSON object whose field names are
/// resolved dynamically from the widget configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row(pub serde_json::Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Values for a configured field, one entry per nested array element.
    /// A missing field (or no configured field at all) yields a single empty
    /// slot so cross-product expansion still visits the row once.
    pub fn field_values(&self, field: Option<&str>) -> Vec<Option<&Value>> {
        let Some(field) = field else {
            return vec![None];
        };
        match self.0.get(field) {
            None | Some(Value::Null) => vec![None],
            Some(Value::Array(items)) if items.is_empty() => vec![None],
            Some(Value::Array(items)) => items.iter().map(Some).collect(),
            Some(v) => vec![Some(v)],
        }
    }
}

/// Node-id coercion. Falsy values (null, empty string, zero, false) yield
/// `None` and the expanded combination is skipped by the caller.
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if n.as_f64() == Some(0.0) {
                None
            } else {
                Some(n.to_string())
            }
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

/// Dates arrive either as RFC 3339 strings or as epoch numbers (seconds, or
/// milliseconds for magnitudes past the year ~5138).
pub fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            if raw.abs() >= 100_000_000_000 {
                Utc.timestamp_millis_opt(raw).single()
            } else {
                Utc.timestamp_opt(raw, 0).single()
            }
        }
        _ => None,
    }
}
