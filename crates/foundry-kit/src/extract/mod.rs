//! Best-effort extraction of structured records from model output.
//!
//! Agents are asked for JSON but frequently answer in prose, or wrap the JSON
//! in explanations and code fences. Extraction is therefore two-staged:
//!
//! 1. **Strict**: take everything between the first `{` and the last `}`,
//!    parse it, and accept it if all required keys are present.
//! 2. **Fallback**: scan the text line by line for keyword triggers and pull
//!    values out with small regexes.
//!
//! The result is always a fully populated record.
//!
//! # Examples
//!
//! ```rust
//! use foundry_kit::extract::{WeatherReport, extract_structured};
//!
//! let report: WeatherReport = extract_structured("Temperature: 22°C\nHumidity: 55%", "Turin");
//! assert_eq!(report.city, "Turin");
//! assert_eq!(report.temperature, "22°C");
//! assert_eq!(report.humidity, "55%");
//! assert_eq!(report.condition, "Unknown");
//! ```

pub mod core;
pub mod error;
pub mod extractors;
pub mod weather;

pub use self::core::{Capture, ExtractionSource, LineRule, StructuredRecord, UNKNOWN};
pub use self::error::ExtractError;
pub use self::extractors::{LineScanner, extract_json_span, extract_record};
pub use self::weather::WeatherReport;

use tracing::debug;

/// Extracts `T` from `text`, trying embedded JSON first and falling back to
/// line scanning. Never fails.
pub fn extract_structured<T: StructuredRecord>(text: &str, subject: &str) -> T {
    extract_structured_with_source(text, subject).0
}

/// Like [`extract_structured`], also reporting which path produced the record.
pub fn extract_structured_with_source<T: StructuredRecord>(
    text: &str,
    subject: &str,
) -> (T, ExtractionSource) {
    match extract_record::<T>(text, T::REQUIRED_KEYS) {
        Ok(record) => (record, ExtractionSource::Json),
        Err(reason) => {
            debug!(%reason, "Strict JSON extraction failed, scanning lines");
            (T::from_text(text, subject), ExtractionSource::LineScan)
        }
    }
}
