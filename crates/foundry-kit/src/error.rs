//! Error types shared by every client in the crate.

use std::time::Duration;
use thiserror::Error;

/// HTTP status codes that indicate a transient failure worth retrying.
pub const RETRYABLE_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Errors that can occur while talking to the hosted agent and chat services.
#[derive(Debug, Error)]
pub enum FoundryError {
    /// A required configuration value (endpoint, identifier, credential) is absent.
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    /// Caller-supplied input was rejected before any remote call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A remote failure that is likely to succeed on retry.
    #[error("Transient remote failure{}: {message}", status_suffix(.status_code))]
    Transient {
        status_code: Option<u16>,
        message: String,
    },

    /// A remote failure that will not be resolved by retrying.
    #[error("Remote call failed{}: {message}", status_suffix(.status_code))]
    Fatal {
        status_code: Option<u16>,
        message: String,
    },

    /// A remote failure annotated with the operation name and attempt count.
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Operation {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<FoundryError>,
    },

    /// A run did not reach a terminal state within the polling budget.
    #[error("Run timed out after {} seconds", whole_secs(.timeout))]
    Timeout { timeout: Duration },

    /// The run finished but produced no usable output.
    #[error("No response: {0}")]
    NoResponse(String),

    /// A response could not be turned into a structured record.
    #[error("Failed to parse response: {0}")]
    ParseFailure(String),
}

fn status_suffix(status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

fn whole_secs(timeout: &Duration) -> u64 {
    timeout.as_secs()
}

impl FoundryError {
    /// Classifies an HTTP error response by its status code.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if RETRYABLE_STATUS_CODES.contains(&status_code) {
            FoundryError::Transient {
                status_code: Some(status_code),
                message,
            }
        } else {
            FoundryError::Fatal {
                status_code: Some(status_code),
                message,
            }
        }
    }

    /// A failure with no HTTP status (connection reset, DNS, timeout...).
    ///
    /// Without a status code there is nothing to classify on, so these are
    /// treated as retryable.
    pub fn network(message: impl Into<String>) -> Self {
        FoundryError::Transient {
            status_code: None,
            message: message.into(),
        }
    }

    /// Wraps this error with the operation name and the number of attempts made.
    pub fn in_operation(self, operation: impl Into<String>, attempts: u32) -> Self {
        FoundryError::Operation {
            operation: operation.into(),
            attempts,
            source: Box::new(self),
        }
    }

    /// Check if this error should trigger an automatic retry.
    ///
    /// Returns `true` only for `Transient` failures (network errors and the
    /// statuses in [`RETRYABLE_STATUS_CODES`]). `Operation` wrappers are
    /// classified by the error they wrap.
    pub fn is_retryable(&self) -> bool {
        match self {
            FoundryError::Transient { .. } => true,
            FoundryError::Operation { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// The HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FoundryError::Transient { status_code, .. }
            | FoundryError::Fatal { status_code, .. } => *status_code,
            FoundryError::Operation { source, .. } => source.status_code(),
            _ => None,
        }
    }

    /// Short machine-readable code for CLI and web error payloads.
    pub fn error_code(&self) -> String {
        match self {
            FoundryError::ConfigurationMissing(_) => "configuration_missing".to_string(),
            FoundryError::InvalidInput(_) => "invalid_input".to_string(),
            FoundryError::Transient {
                status_code: Some(code),
                ..
            }
            | FoundryError::Fatal {
                status_code: Some(code),
                ..
            } => format!("http_{code}"),
            FoundryError::Transient { .. } => "network".to_string(),
            FoundryError::Fatal { .. } => "remote".to_string(),
            FoundryError::Operation { source, .. } => source.error_code(),
            FoundryError::Timeout { .. } => "timeout".to_string(),
            FoundryError::NoResponse(_) => "no_response".to_string(),
            FoundryError::ParseFailure(_) => "parse_failure".to_string(),
        }
    }
}

impl From<serde_json::Error> for FoundryError {
    fn from(err: serde_json::Error) -> Self {
        FoundryError::ParseFailure(err.to_string())
    }
}
