//! Hosted agent service: threads, messages and runs.
//!
//! [`AgentService`] is the seam between the orchestration in
//! [`WeatherAgent`] and the transport. The `http` feature provides
//! [`FoundryAgentsClient`]; tests substitute scripted implementations.
//!
//! A request to an agent is three remote calls (create a thread, add the
//! user message, start a run), followed by status polling and, once the run
//! has completed, reading the newest assistant message back.

#[cfg(feature = "http")]
pub mod http;
pub mod weather;

#[cfg(feature = "http")]
pub use http::FoundryAgentsClient;
pub use weather::{Diagnostics, WeatherAgent};

use crate::error::FoundryError;
use crate::run::RunSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A conversation container on the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
}

/// Author of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// A thread message with its text blocks concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    pub text: String,
}

impl ThreadMessage {
    pub fn new(id: impl Into<String>, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            text: text.into(),
        }
    }
}

/// Agent metadata reported by diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub model: Option<String>,
    /// Tool type names, e.g. `code_interpreter`.
    #[serde(default)]
    pub tools: Vec<String>,
}

/// Remote operations of the hosted agent service.
///
/// Implementations report HTTP failures with [`FoundryError::from_status`]
/// and connection failures with [`FoundryError::network`] so that callers
/// can decide what to retry.
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn create_thread(&self) -> Result<Thread, FoundryError>;

    /// Appends a user message to the thread.
    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadMessage, FoundryError>;

    /// Starts the assistant on the thread.
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, FoundryError>;

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, FoundryError>;

    /// Messages of the thread, newest first.
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, FoundryError>;

    async fn delete_thread(&self, thread_id: &str) -> Result<(), FoundryError>;

    async fn get_agent(&self, assistant_id: &str) -> Result<AgentInfo, FoundryError>;
}

#[async_trait]
impl<S: AgentService + ?Sized> AgentService for Arc<S> {
    async fn create_thread(&self) -> Result<Thread, FoundryError> {
        (**self).create_thread().await
    }

    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadMessage, FoundryError> {
        (**self).add_message(thread_id, content).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, FoundryError> {
        (**self).create_run(thread_id, assistant_id).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, FoundryError> {
        (**self).get_run(thread_id, run_id).await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, FoundryError> {
        (**self).list_messages(thread_id).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), FoundryError> {
        (**self).delete_thread(thread_id).await
    }

    async fn get_agent(&self, assistant_id: &str) -> Result<AgentInfo, FoundryError> {
        (**self).get_agent(assistant_id).await
    }
}

/// Text of the newest assistant message, if it has any.
///
/// `messages` must be ordered newest first, as returned by
/// [`AgentService::list_messages`].
pub fn latest_assistant_text(messages: &[ThreadMessage]) -> Option<&str> {
    messages
        .iter()
        .find(|m| m.role == MessageRole::Assistant)
        .map(|m| m.text.as_str())
        .filter(|text| !text.trim().is_empty())
}
