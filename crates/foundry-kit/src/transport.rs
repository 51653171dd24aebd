//! reqwest plumbing shared by the REST clients.

use crate::config::Credential;
use crate::error::FoundryError;
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, FoundryError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| FoundryError::Fatal {
            status_code: None,
            message: format!("Failed to build HTTP client: {err}"),
        })
}

/// Parses `endpoint` as the base for relative joins.
///
/// A trailing slash is added so that `join` appends to the last path
/// segment instead of replacing it.
pub(crate) fn base_url(endpoint: &str) -> Result<Url, FoundryError> {
    let trimmed = endpoint.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash)
        .map_err(|err| FoundryError::InvalidInput(format!("Invalid endpoint '{trimmed}': {err}")))
}

pub(crate) fn join(base: &Url, path: &str, api_version: &str) -> Result<Url, FoundryError> {
    let mut url = base
        .join(path)
        .map_err(|err| FoundryError::InvalidInput(format!("Invalid request path '{path}': {err}")))?;
    url.query_pairs_mut().append_pair("api-version", api_version);
    Ok(url)
}

pub(crate) fn authorize(request: RequestBuilder, credential: Option<&Credential>) -> RequestBuilder {
    match credential {
        Some(Credential::Bearer(token)) => request.bearer_auth(token),
        Some(Credential::ApiKey(key)) => request.header("api-key", key),
        None => request,
    }
}

/// Sends `request` and decodes a JSON success body.
///
/// Transport failures become retryable network errors; non-2xx responses
/// are classified by status.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    service: &str,
) -> Result<T, FoundryError> {
    let response = request
        .send()
        .await
        .map_err(|err| FoundryError::network(format!("{service} request failed: {err}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| format!("Failed to read {service} error body"));
        return Err(map_http_error(status, body));
    }

    response
        .json::<T>()
        .await
        .map_err(|err| FoundryError::ParseFailure(format!("Failed to parse {service} response: {err}")))
}

pub(crate) fn map_http_error(status: StatusCode, body: String) -> FoundryError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| match wrapper.error.code {
            Some(code) => format!("{code}: {}", wrapper.error.message),
            None => wrapper.error.message,
        })
        .unwrap_or(body);

    FoundryError::from_status(status.as_u16(), message)
}
