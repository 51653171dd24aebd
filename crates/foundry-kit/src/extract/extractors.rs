use super::core::{Capture, LineRule};
use super::error::ExtractError;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("number pattern is valid"));

/// Returns the substring from the first `{` to the last `}`, inclusive.
///
/// No attempt is made to balance braces: anything between the outermost
/// pair is handed to the JSON parser as-is.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parses the embedded JSON object and deserializes it into `T`.
///
/// Succeeds only if the object contains every key in `required_keys` and
/// its values fit `T`.
pub fn extract_record<T: DeserializeOwned>(
    text: &str,
    required_keys: &[&str],
) -> Result<T, ExtractError> {
    let span = extract_json_span(text).ok_or(ExtractError::NoJsonObject)?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| ExtractError::InvalidJson(e.to_string()))?;

    let object = value.as_object().ok_or(ExtractError::NotAnObject)?;
    let missing: Vec<String> = required_keys
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ExtractError::MissingFields(missing));
    }

    serde_json::from_value(value).map_err(|e| ExtractError::UnexpectedShape(e.to_string()))
}

/// Line-oriented keyword scanner.
///
/// Each line is lowercased and checked against the rules in order; the first
/// rule whose trigger appears on the line is the only one applied to it. A
/// later line overwrites a value captured by an earlier one.
pub struct LineScanner<'a> {
    rules: &'a [LineRule],
}

impl<'a> LineScanner<'a> {
    pub fn new(rules: &'a [LineRule]) -> Self {
        Self { rules }
    }

    /// Returns the captured value for every field that matched somewhere.
    pub fn scan(&self, text: &str) -> BTreeMap<&'static str, String> {
        let mut captured = BTreeMap::new();

        for line in text.trim().lines() {
            let lowered = line.trim().to_lowercase();
            let Some(rule) = self.rules.iter().find(|rule| rule.matches(&lowered)) else {
                continue;
            };

            if let Some(value) = apply_capture(&rule.capture, &lowered) {
                debug!(field = rule.field, value = %value, "Captured field from line");
                captured.insert(rule.field, value);
            }
        }

        captured
    }
}

fn apply_capture(capture: &Capture, lowered_line: &str) -> Option<String> {
    match capture {
        Capture::Number { suffix } => NUMBER
            .captures(lowered_line)
            .and_then(|caps| caps.get(1))
            .map(|m| format!("{}{}", m.as_str(), suffix)),
        Capture::Vocabulary(terms) => terms
            .iter()
            .find(|(term, _)| lowered_line.contains(term))
            .map(|(_, label)| label.to_string()),
    }
}
