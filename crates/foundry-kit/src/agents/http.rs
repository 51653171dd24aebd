//! FoundryAgentsClient - REST implementation of [`AgentService`].
//!
//! Talks to the agents endpoint of an AI Foundry project
//! (`https://<resource>.services.ai.azure.com/api/projects/<project>`).
//!
//! # Example
//!
//! ```rust,no_run
//! use foundry_kit::agents::{AgentService, FoundryAgentsClient};
//! use foundry_kit::config::{AgentConfig, Credential};
//!
//! # async fn example() -> Result<(), foundry_kit::FoundryError> {
//! let config = AgentConfig::new("https://demo.services.ai.azure.com/api/projects/demo")
//!     .with_credential(Credential::Bearer("<token>".to_string()));
//! let client = FoundryAgentsClient::new(&config)?;
//! let thread = client.create_thread().await?;
//! client.delete_thread(&thread.id).await?;
//! # Ok(())
//! # }
//! ```

use super::{AgentInfo, AgentService, MessageRole, Thread, ThreadMessage};
use crate::config::{AgentConfig, Credential};
use crate::error::FoundryError;
use crate::run::RunSnapshot;
use crate::transport;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const SERVICE: &str = "Agent service";

/// Agent service client over HTTPS.
#[derive(Clone)]
pub struct FoundryAgentsClient {
    client: Client,
    base: Url,
    api_version: String,
    credential: Option<Credential>,
}

impl FoundryAgentsClient {
    /// Builds a client for the endpoint and credential in `config`.
    ///
    /// The per-request HTTP timeout is the configured run timeout.
    pub fn new(config: &AgentConfig) -> Result<Self, FoundryError> {
        Ok(Self {
            client: transport::build_client(config.timeout)?,
            base: transport::base_url(&config.endpoint)?,
            api_version: config.api_version.clone(),
            credential: config.credential.clone(),
        })
    }

    /// Overrides the `api-version` query parameter.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, FoundryError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = transport::join(&self.base, path, &self.api_version)?;
        debug!(%method, %url, "Agent service request");

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        transport::send_json(transport::authorize(request, self.credential.as_ref()), SERVICE).await
    }
}

#[async_trait]
impl AgentService for FoundryAgentsClient {
    async fn create_thread(&self) -> Result<Thread, FoundryError> {
        self.call(Method::POST, "threads", Some(&serde_json::json!({})))
            .await
    }

    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadMessage, FoundryError> {
        let body = CreateMessageRequest {
            role: "user",
            content,
        };
        let message: MessageResponse = self
            .call(Method::POST, &format!("threads/{thread_id}/messages"), Some(&body))
            .await?;
        Ok(message.into())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, FoundryError> {
        let body = CreateRunRequest { assistant_id };
        self.call(Method::POST, &format!("threads/{thread_id}/runs"), Some(&body))
            .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, FoundryError> {
        self.call::<(), _>(Method::GET, &format!("threads/{thread_id}/runs/{run_id}"), None)
            .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, FoundryError> {
        let list: MessageList = self
            .call::<(), _>(
                Method::GET,
                &format!("threads/{thread_id}/messages?order=desc"),
                None,
            )
            .await?;
        Ok(list.data.into_iter().map(ThreadMessage::from).collect())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), FoundryError> {
        let _: serde_json::Value = self
            .call::<(), _>(Method::DELETE, &format!("threads/{thread_id}"), None)
            .await?;
        Ok(())
    }

    async fn get_agent(&self, assistant_id: &str) -> Result<AgentInfo, FoundryError> {
        let agent: AgentResponse = self
            .call::<(), _>(Method::GET, &format!("assistants/{assistant_id}"), None)
            .await?;
        Ok(agent.into())
    }
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<MessageResponse>,
}

#[derive(Deserialize)]
struct MessageResponse {
    id: String,
    role: MessageRole,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Deserialize)]
struct TextContent {
    value: String,
}

impl From<MessageResponse> for ThreadMessage {
    fn from(message: MessageResponse) -> Self {
        let text: String = message
            .content
            .into_iter()
            .filter_map(|block| block.text.map(|t| t.value))
            .collect();
        ThreadMessage::new(message.id, message.role, text)
    }
}

#[derive(Deserialize)]
struct AgentResponse {
    id: String,
    name: Option<String>,
    description: Option<String>,
    model: Option<String>,
    #[serde(default)]
    tools: Vec<ToolRef>,
}

#[derive(Deserialize)]
struct ToolRef {
    #[serde(rename = "type")]
    kind: String,
}

impl From<AgentResponse> for AgentInfo {
    fn from(agent: AgentResponse) -> Self {
        AgentInfo {
            id: agent.id,
            name: agent.name,
            description: agent.description,
            model: agent.model,
            tools: agent.tools.into_iter().map(|t| t.kind).collect(),
        }
    }
}
