//! AzureOpenAiChat - Direct REST implementation of [`ChatBackend`].
//!
//! Calls the deployment-scoped chat completions route:
//! `{endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`.
//! Attaching a [`SearchDataSource`] turns every request into a grounded
//! ("on your data") completion.
//!
//! # Example
//!
//! ```rust,no_run
//! use foundry_kit::chat::{AzureOpenAiChat, ChatSession};
//! use foundry_kit::config::ChatConfig;
//!
//! # async fn example() -> Result<(), foundry_kit::FoundryError> {
//! let config = ChatConfig::from_env()?;
//! let backend = AzureOpenAiChat::new(&config)?;
//! let mut session = ChatSession::with_system_prompt("You are concise.");
//! let reply = session.send(&backend, &config.retry_policy(), "Hello!").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

use super::{ChatBackend, ChatMessage};
use crate::config::{ChatConfig, Credential};
use crate::error::FoundryError;
use crate::rag::SearchDataSource;
use crate::transport;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{Instrument, Span, debug, info_span};
use url::Url;

const SERVICE: &str = "Chat completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Chat completions client for one Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureOpenAiChat {
    client: Client,
    url: Url,
    credential: Option<Credential>,
    max_tokens: u32,
    temperature: f32,
    data_sources: Vec<SearchDataSource>,
    span: Span,
}

impl AzureOpenAiChat {
    pub fn new(config: &ChatConfig) -> Result<Self, FoundryError> {
        let base = transport::base_url(&config.endpoint)?;
        let path = format!(
            "openai/deployments/{}/chat/completions",
            config.deployment_name
        );
        Ok(Self {
            client: transport::build_client(REQUEST_TIMEOUT)?,
            url: transport::join(&base, &path, &config.api_version)?,
            credential: config.credential.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            data_sources: Vec::new(),
            span: info_span!("chat_completion", deployment = %config.deployment_name),
        })
    }

    /// Grounds every completion on `source`.
    pub fn with_search(mut self, source: SearchDataSource) -> Self {
        self.data_sources.push(source);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage]) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
            data_sources: (!self.data_sources.is_empty()).then_some(self.data_sources.as_slice()),
        }
    }

    async fn send_request(&self, messages: &[ChatMessage]) -> Result<String, FoundryError> {
        debug!(
            messages = messages.len(),
            grounded = !self.data_sources.is_empty(),
            "Sending chat completion"
        );
        let request = self
            .client
            .post(self.url.clone())
            .json(&self.request_body(messages));
        let response: ChatCompletionResponse =
            transport::send_json(transport::authorize(request, self.credential.as_ref()), SERVICE)
                .await?;

        extract_text_response(response)
    }
}

#[async_trait]
impl ChatBackend for AzureOpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, FoundryError> {
        self.send_request(messages)
            .instrument(self.span.clone())
            .await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_sources: Option<&'a [SearchDataSource]>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, FoundryError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| FoundryError::NoResponse("Chat completion returned no content".into()))
}
