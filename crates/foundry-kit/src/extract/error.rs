/// Reasons the strict JSON path of the extractor gave up.
///
/// These never reach callers of [`super::extract_structured`]; they are
/// logged and the line scanner takes over.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("No JSON object found in response")]
    NoJsonObject,

    #[error("Embedded JSON is invalid: {0}")]
    InvalidJson(String),

    #[error("Embedded JSON is not an object")]
    NotAnObject,

    #[error("Missing required fields: {0:?}")]
    MissingFields(Vec<String>),

    #[error("Embedded JSON has unexpected shape: {0}")]
    UnexpectedShape(String),
}
