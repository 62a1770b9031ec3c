// JSON response envelope parsing

use crate::errors::ConsoleError;
use serde_json::{Map, Value};

/// Parsed console response
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// The `result` member, an empty object when the director sent none
    pub result: Value,
    pub raw: Value,
}

impl Envelope {
    /// True when `result` carries nothing at all
    pub fn is_empty(&self) -> bool {
        match &self.result {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

/// Parse a response, turning director error envelopes into `ServerError`
pub fn parse_envelope(text: &str) -> Result<Envelope, ConsoleError> {
    let raw: Value = serde_json::from_str(text.trim())?;
    let Value::Object(ref object) = raw else {
        return Err(ConsoleError::MalformedResponse(format!(
            "expected a JSON object, got: {}",
            truncate(text)
        )));
    };

    if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
        return Err(server_error(error));
    }

    let result = match object.get("result") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(result) => result.clone(),
    };

    Ok(Envelope { result, raw })
}

/// Parse a response and keep only its `result` member
pub fn parse_result(text: &str) -> Result<Value, ConsoleError> {
    parse_envelope(text).map(|envelope| envelope.result)
}

fn server_error(error: &Value) -> ConsoleError {
    let code = error.get("code").and_then(Value::as_i64);
    let mut message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    // Director job messages carry the detail the short message lacks
    let details: Vec<&str> = error
        .pointer("/data/messages/error")
        .and_then(Value::as_array)
        .map(|lines| lines.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !details.is_empty() {
        message.push_str(": ");
        message.push_str(details.join(" ").trim());
    }

    ConsoleError::ServerError { code, message }
}

fn truncate(text: &str) -> String {
    const MAX: usize = 120;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
