use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::model::FieldType;

pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

pub const NONE_SELECTED: &str = "None selected";
pub const NOT_SELECTED: &str = "Not selected";
pub const NOT_SPECIFIED: &str = "Not specified";

/// Display string for an answer, using [`DEFAULT_DATE_FORMAT`] for dates.
pub fn format_answer(field_type: FieldType, value: Option<&Value>) -> String {
    format_answer_with(field_type, value, DEFAULT_DATE_FORMAT)
}

/// Display string for an answer. Never fails: anything unparseable degrades
/// to its raw text.
pub fn format_answer_with(field_type: FieldType, value: Option<&Value>, date_format: &str) -> String {
    let value = value.filter(|v| !v.is_null());
    match field_type {
        FieldType::Checkbox => {
            if value.is_some_and(is_checked) {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        }
        FieldType::MultiChoice => {
            let selected = value.map(selected_options).unwrap_or_default();
            if selected.is_empty() {
                NONE_SELECTED.to_string()
            } else {
                selected.join(", ")
            }
        }
        FieldType::Radio | FieldType::Dropdown => {
            let text = value.map(stringify).unwrap_or_default();
            if text.trim().is_empty() {
                NOT_SELECTED.to_string()
            } else {
                text
            }
        }
        FieldType::Date => {
            let raw = value.map(stringify).unwrap_or_default();
            if raw.trim().is_empty() {
                return NOT_SPECIFIED.to_string();
            }
            match parse_date(&raw) {
                Some(date) => format_date(date, date_format).unwrap_or(raw),
                None => raw,
            }
        }
        FieldType::ShortText | FieldType::LongText | FieldType::Number => {
            value.map(stringify).unwrap_or_default()
        }
    }
}

/// Format a date with a chrono format string; `None` if the format string is invalid.
pub(crate) fn format_date(date: NaiveDate, date_format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(date_format)).ok()?;
    Some(out)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

fn selected_options(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| is_truthy(v))
            .map(|(k, _)| k.clone())
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn is_checked(value: &Value) -> bool {
    match value {
        Value::String(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "false" | "no" | "off" | "0"
        ),
        other => is_truthy(other),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(stringify)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}
