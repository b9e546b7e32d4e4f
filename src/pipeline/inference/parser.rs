use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::InferenceError;
use crate::pipeline::allocation::validation::{is_valid_percent, validated_percent};
use crate::pipeline::allocation::Field;

/// A flat JSON object, optionally inside a ```json fence.
static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{[^{}]*\}").unwrap());

/// Parse a provider reply into validated values for the requested fields.
///
/// Unknown keys, fields not requested, nulls, and out-of-range values are
/// dropped. A reply with no usable value at all is an error, so the next
/// provider gets a chance.
pub fn parse_allocation_response(
    response: &str,
    requested: &[Field],
) -> Result<BTreeMap<Field, f64>, InferenceError> {
    let object = extract_json_object(response, |key| Field::from_key(key).is_some())?;

    let mut values = BTreeMap::new();
    for (key, raw) in &object {
        let Some(field) = Field::from_key(key) else {
            tracing::debug!(key = %key, "Ignoring unknown key in provider reply");
            continue;
        };
        if !requested.contains(&field) || values.contains_key(&field) {
            continue;
        }
        match value_as_percent(raw) {
            Some(value) => {
                values.insert(field, value);
            }
            None => {
                tracing::debug!(field = %field, raw = %raw, "Discarding unusable provider value");
            }
        }
    }

    if values.is_empty() {
        return Err(InferenceError::EmptyResult);
    }
    Ok(values)
}

/// Parse a provider reply into cleaned amounts for the expected table labels.
///
/// Keys match labels ignoring case and a trailing colon. Amounts lose
/// thousands separators and spaces and must read as a number; negatives are
/// kept.
pub fn parse_performance_response(
    response: &str,
    expected: &[&str],
) -> Result<BTreeMap<String, String>, InferenceError> {
    let object = extract_json_object(response, |key| {
        expected.iter().any(|label| same_label(label, key))
    })?;

    let mut amounts = BTreeMap::new();
    for label in expected {
        let Some(raw) = object
            .iter()
            .find(|(key, _)| same_label(label, key))
            .map(|(_, raw)| raw)
        else {
            continue;
        };
        match value_as_amount(raw) {
            Some(amount) => {
                amounts.insert(label.to_string(), amount);
            }
            None => {
                tracing::debug!(label = %label, raw = %raw, "Discarding unusable provider amount");
            }
        }
    }

    if amounts.is_empty() {
        return Err(InferenceError::EmptyResult);
    }
    Ok(amounts)
}

/// Locate the reply's JSON object, preferring a fenced block when present.
/// Brace groups that do not parse, or parse without a key accepted by
/// `known_key`, are passed over in favour of a later one.
fn extract_json_object(
    response: &str,
    known_key: impl Fn(&str) -> bool,
) -> Result<Map<String, Value>, InferenceError> {
    let scope = match response.find("```json") {
        Some(start) => {
            let body = &response[start + 7..];
            match body.find("```") {
                Some(end) => &body[..end],
                None => body,
            }
        }
        None => response,
    };

    let mut first_parsed = None;
    let mut last_error = None;
    for candidate in JSON_OBJECT
        .find_iter(scope)
        .chain(JSON_OBJECT.find_iter(response))
    {
        match serde_json::from_str::<Map<String, Value>>(candidate.as_str()) {
            Ok(object) if object.keys().any(|k| known_key(k.as_str())) => {
                return Ok(object)
            }
            Ok(object) => {
                first_parsed.get_or_insert(object);
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    match (first_parsed, last_error) {
        (Some(object), _) => Ok(object),
        (None, Some(reason)) => Err(InferenceError::JsonParsing(reason)),
        (None, None) => Err(InferenceError::MalformedResponse("No JSON object found".into())),
    }
}

fn same_label(label: &str, key: &str) -> bool {
    let norm = |s: &str| s.trim().trim_end_matches(':').trim().to_lowercase();
    norm(label) == norm(key)
}

fn value_as_amount(raw: &Value) -> Option<String> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '\'' | ' ' | '\u{a0}' | '\u{202f}'))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|_| cleaned)
}

fn value_as_percent(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|v| is_valid_percent(*v)),
        Value::String(s) => validated_percent(s),
        _ => None,
    }
}
