//! Multi-turn chat over a completions backend.
//!
//! [`ChatSession`] keeps the conversation; a [`ChatBackend`] turns the full
//! history into the next assistant reply.

#[cfg(feature = "http")]
pub mod azure_openai;

#[cfg(feature = "http")]
pub use azure_openai::AzureOpenAiChat;

use crate::error::FoundryError;
use crate::retry::{RetryPolicy, retry_with_backoff};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Produces the next assistant reply for a conversation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, FoundryError>;
}

#[async_trait]
impl<B: ChatBackend + ?Sized> ChatBackend for Arc<B> {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, FoundryError> {
        (**self).complete(messages).await
    }
}

/// System prompt for the interactive project chat.
pub fn project_system_prompt(project_name: &str, deployment_name: &str) -> String {
    format!(
        "You are a helpful AI assistant powered by Azure AI Foundry project '{project_name}' \
         using deployment '{deployment_name}'. You provide accurate and helpful responses \
         through the AI Foundry inference client."
    )
}

/// Ordered conversation history with an optional leading system prompt.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    system_prompt: Option<ChatMessage>,
    turns: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(ChatMessage::system(prompt)),
            turns: Vec::new(),
        }
    }

    /// The full conversation as sent to the backend.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.system_prompt
            .iter()
            .chain(self.turns.iter())
            .cloned()
            .collect()
    }

    /// User and assistant turns only.
    pub fn history(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drops every turn, keeping the system prompt.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Sends a user message and records the reply.
    ///
    /// The backend is called through [`retry_with_backoff`]. If it still
    /// fails, the user turn is removed again so the history never ends on an
    /// unanswered message.
    pub async fn send<B: ChatBackend + ?Sized>(
        &mut self,
        backend: &B,
        policy: &RetryPolicy,
        text: &str,
    ) -> Result<String, FoundryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FoundryError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }

        self.turns.push(ChatMessage::user(text));
        let messages = self.messages();
        let messages = messages.as_slice();

        let result = retry_with_backoff(policy, "chat_completion", move || {
            backend.complete(messages)
        })
        .await;

        match result {
            Ok(reply) => {
                self.turns.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.turns.pop();
                debug!(turns = self.turns.len(), "Rolled back unanswered user turn");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results and records what it was asked.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, FoundryError>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, FoundryError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, FoundryError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(FoundryError::NoResponse("script exhausted".into())))
        }
    }

    #[tokio::test]
    async fn test_send_records_both_turns() {
        let backend = Scripted::new(vec![Ok("Hi there".to_string())]);
        let mut session = ChatSession::with_system_prompt("Be brief.");

        let reply = session
            .send(&backend, &RetryPolicy::default(), "  Hello ")
            .await
            .unwrap();

        assert_eq!(reply, "Hi there");
        assert_eq!(
            session.history(),
            &[ChatMessage::user("Hello"), ChatMessage::assistant("Hi there")]
        );
        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0][0], ChatMessage::system("Be brief."));
        assert_eq!(seen[0].len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_retries_transient_failures() {
        let backend = Scripted::new(vec![
            Err(FoundryError::from_status(503, "busy")),
            Ok("Recovered".to_string()),
        ]);
        let mut session = ChatSession::new();

        let reply = session
            .send(&backend, &RetryPolicy::new(3), "ping")
            .await
            .unwrap();

        assert_eq!(reply, "Recovered");
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_send_rolls_back_user_turn() {
        let backend = Scripted::new(vec![
            Ok("first".to_string()),
            Err(FoundryError::from_status(400, "bad request")),
        ]);
        let mut session = ChatSession::new();
        let policy = RetryPolicy::default();

        session.send(&backend, &policy, "one").await.unwrap();
        let err = session.send(&backend, &policy, "two").await.unwrap_err();

        assert_eq!(err.status_code(), Some(400));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1], ChatMessage::assistant("first"));
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let backend = Scripted::new(vec![]);
        let mut session = ChatSession::new();
        let err = session
            .send(&backend, &RetryPolicy::default(), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput(_)));
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_clear_keeps_system_prompt() {
        let mut session = ChatSession::with_system_prompt("sys");
        session.turns.push(ChatMessage::user("hello"));
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.messages(), vec![ChatMessage::system("sys")]);
    }

    #[test]
    fn test_role_wire_names() {
        let json = serde_json::to_string(&ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
