// src/models/lenient.rs

//! Field decoders for payloads whose schema drifts between questions and
//! backend versions. None of them fail on an unexpected value; they fall
//! back to the field's empty state instead.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::{id::ExternalId, question::QuestionType};

/// Accepts numbers or numeric strings; anything else, and negatives, count as zero.
pub(crate) fn lenient_points<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let points = lenient_number(deserializer)?.unwrap_or(0.0);
    Ok(if points > 0.0 { points } else { 0.0 })
}

/// A number or a numeric string such as `"6.00"`; `None` for anything else.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

/// `true`/`false`, also as strings or 0/1; `None` for anything else.
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Like `lenient_flag`, but an unreadable value is `false`.
pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_flag(deserializer)?.unwrap_or(false))
}

/// Text; `null` becomes empty and scalars are stringified.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

pub(crate) fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        value => Some(stringify(value)),
    })
}

/// An option list with every item stringified. Items are never dropped, so
/// answer indices keep pointing at the same option.
pub(crate) fn lenient_options<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => Some(items.into_iter().map(stringify).collect()),
        _ => None,
    })
}

pub(crate) fn lenient_option_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_options(deserializer)?.unwrap_or_default())
}

/// A string or integer id; empty when missing or unreadable.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<ExternalId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => ExternalId::from(s),
        Value::Number(n) => ExternalId::from(n.to_string()),
        _ => ExternalId::default(),
    })
}

pub(crate) fn lenient_question_type<'de, D>(deserializer: D) -> Result<QuestionType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(QuestionType::deserialize(raw).unwrap_or_default())
}

/// `null` or a value of the wrong shape decodes as `T::default()`.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(T::deserialize(raw).unwrap_or_default())
}

fn stringify(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
