use serde::de::DeserializeOwned;

/// Sentinel stored in any field the extractor could not populate.
pub const UNKNOWN: &str = "Unknown";

/// A fixed-shape record that can be recovered from free-form model output.
///
/// Implementors name the JSON keys that must all be present for the strict
/// path to be taken, and provide a fallback that always yields a fully
/// populated value.
pub trait StructuredRecord: DeserializeOwned {
    /// Keys that must all appear in the embedded JSON object.
    const REQUIRED_KEYS: &'static [&'static str];

    /// Builds the record from unstructured text. Must never fail: fields
    /// that cannot be recovered are set to [`UNKNOWN`].
    fn from_text(text: &str, subject: &str) -> Self;
}

/// How a record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Parsed from an embedded JSON object.
    Json,
    /// Recovered by line-oriented keyword scanning.
    LineScan,
}

/// What to pull out of a line once one of its triggers matched.
#[derive(Debug, Clone, Copy)]
pub enum Capture {
    /// The first decimal number on the line, followed by `suffix`.
    Number { suffix: &'static str },
    /// The canonical label of the first vocabulary term found on the line.
    Vocabulary(&'static [(&'static str, &'static str)]),
}

/// A keyword-triggered extraction rule for one field.
#[derive(Debug, Clone, Copy)]
pub struct LineRule {
    pub field: &'static str,
    /// Lowercase substrings that select this rule for a line.
    pub triggers: &'static [&'static str],
    pub capture: Capture,
}

impl LineRule {
    pub fn matches(&self, lowered_line: &str) -> bool {
        self.triggers.iter().any(|t| lowered_line.contains(t))
    }
}
