// src/grading/correct_answer.rs

use serde_json::Value;

/// Canonical form of a question's answer key.
///
/// The exam service delivers `correct_answer` as a plain string, a JSON
/// array, a JSON-array string, or a brace-encoded array string such as
/// `{"A","B,C",D}`. Parsing never fails; malformed input degrades to a
/// best-effort split.
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectAnswer {
    /// No answer key was delivered.
    Unknown,
    /// A plain string that was not an encoded array.
    Scalar(String),
    /// A set of accepted values, in delivery order, without duplicates.
    Set(Vec<String>),
}

impl CorrectAnswer {
    pub fn parse(raw: Option<&Value>) -> Self {
        match raw {
            None | Some(Value::Null) => CorrectAnswer::Unknown,
            Some(Value::Array(items)) => CorrectAnswer::Set(dedup(items.iter().map(value_text))),
            Some(Value::String(s)) => parse_text(s),
            Some(Value::Number(n)) => CorrectAnswer::Scalar(n.to_string()),
            Some(Value::Bool(b)) => CorrectAnswer::Scalar(b.to_string()),
            // Nothing sensible can be accepted from an object.
            Some(Value::Object(_)) => CorrectAnswer::Set(Vec::new()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CorrectAnswer::Unknown)
    }

    /// Falls back to another answer key when this one is unknown.
    pub fn or_else(self, fallback: impl FnOnce() -> CorrectAnswer) -> CorrectAnswer {
        match self {
            CorrectAnswer::Unknown => fallback(),
            known => known,
        }
    }

    pub fn accepted(&self) -> &[String] {
        match self {
            CorrectAnswer::Unknown => &[],
            CorrectAnswer::Scalar(value) => std::slice::from_ref(value),
            CorrectAnswer::Set(values) => values,
        }
    }

    /// A multi-answer question accepts two or more values.
    pub fn is_multi(&self) -> bool {
        matches!(self, CorrectAnswer::Set(values) if values.len() > 1)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn dedup(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

fn parse_text(raw: &str) -> CorrectAnswer {
    let trimmed = raw.trim();

    if trimmed.len() >= 2 && trimmed.starts_with('{') && trimmed.ends_with('}') {
        let inner = &trimmed[1..trimmed.len() - 1];
        return CorrectAnswer::Set(dedup(decode_braced(inner).into_iter()));
    }

    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        if let Ok(items) = serde_json::from_str::<Vec<Value>>(trimmed) {
            return CorrectAnswer::Set(dedup(items.iter().map(value_text)));
        }
    }

    CorrectAnswer::Scalar(raw.to_string())
}

/// Decodes the content between the braces of an encoded array.
fn decode_braced(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    match split_outside_quotes(inner) {
        Some(tokens) => tokens.into_iter().map(unquote_token).collect(),
        None => inner
            .split(',')
            .map(|token| {
                let token = token.trim();
                let token = token.strip_prefix('"').unwrap_or(token);
                let token = token.strip_suffix('"').unwrap_or(token);
                token.trim().to_string()
            })
            .collect(),
    }
}

/// Splits on commas outside double-quoted segments. `None` when quotes are unbalanced.
fn split_outside_quotes(inner: &str) -> Option<Vec<&str>> {
    let mut tokens = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in inner.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                tokens.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes || escaped {
        return None;
    }
    tokens.push(&inner[start..]);
    Some(tokens)
}

fn unquote_token(token: &str) -> String {
    let token = token.trim();
    let quoted = token.len() >= 2 && token.starts_with('"') && token.ends_with('"');
    if !quoted {
        return token.to_string();
    }

    let mut out = String::with_capacity(token.len());
    let mut chars = token[1..token.len() - 1].chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out.trim().to_string()
}
