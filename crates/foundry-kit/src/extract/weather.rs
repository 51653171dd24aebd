//! The weather record returned by the weather agent.

use super::core::{Capture, LineRule, StructuredRecord, UNKNOWN};
use super::extractors::LineScanner;
use crate::error::FoundryError;
use serde::{Deserialize, Serialize};

const CONDITIONS: &[(&str, &str)] = &[
    ("sunny", "Sunny"),
    ("cloudy", "Cloudy"),
    ("rainy", "Rainy"),
    ("rain", "Rainy"),
    ("clear", "Clear"),
];

/// Fallback rules, in priority order.
const WEATHER_RULES: &[LineRule] = &[
    LineRule {
        field: "temperature",
        triggers: &["temperature", "temp"],
        capture: Capture::Number { suffix: "°C" },
    },
    LineRule {
        field: "condition",
        triggers: &["condition", "weather"],
        capture: Capture::Vocabulary(CONDITIONS),
    },
    LineRule {
        field: "humidity",
        triggers: &["humidity"],
        capture: Capture::Number { suffix: "%" },
    },
];

/// Current weather for one city. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: String,
    pub condition: String,
    pub humidity: String,
}

impl WeatherReport {
    /// A report for `city` with every measurement set to `"Unknown"`.
    pub fn unknown(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            temperature: UNKNOWN.to_string(),
            condition: UNKNOWN.to_string(),
            humidity: UNKNOWN.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, FoundryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl StructuredRecord for WeatherReport {
    const REQUIRED_KEYS: &'static [&'static str] = &["city", "temperature", "condition", "humidity"];

    fn from_text(text: &str, subject: &str) -> Self {
        let mut captured = LineScanner::new(WEATHER_RULES).scan(text);
        let mut take = |field: &str| captured.remove(field).unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            city: subject.to_string(),
            temperature: take("temperature"),
            condition: take("condition"),
            humidity: take("humidity"),
        }
    }
}
