//! Configuration for the agent, chat and retrieval clients.
//!
//! Each surface has one explicit struct, built once at startup and passed
//! into the clients. Values come from the process environment (after loading
//! a `.env` file if present) and are validated for presence only.
//!
//! # Examples
//!
//! ```
//! use foundry_kit::config::AgentConfig;
//! use std::collections::HashMap;
//!
//! let env = HashMap::from([(
//!     "AZURE_AI_PROJECT_ENDPOINT".to_string(),
//!     "https://demo.services.ai.azure.com/api/projects/demo".to_string(),
//! )]);
//! let config = AgentConfig::from_lookup(|key| env.get(key).cloned()).unwrap();
//! assert_eq!(config.max_retries, 3);
//! ```

use crate::error::FoundryError;
use crate::retry::RetryPolicy;
use crate::run::RunPoller;
use std::fmt;
use std::time::Duration;

/// Names of the environment variables read by this module.
pub mod vars {
    pub const PROJECT_ENDPOINT: &str = "AZURE_AI_PROJECT_ENDPOINT";
    pub const ASSISTANT_ID: &str = "ASSISTANT_ID";
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
    pub const MAX_RETRIES: &str = "MAX_RETRIES";
    pub const AGENT_ACCESS_TOKEN: &str = "AZURE_AI_ACCESS_TOKEN";
    pub const AGENT_API_KEY: &str = "AZURE_AI_API_KEY";
    pub const AGENTS_API_VERSION: &str = "AZURE_AGENTS_API_VERSION";

    pub const OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
    pub const CHAT_PROJECT_ENDPOINT: &str = "PROJECT_ENDPOINT";
    pub const DEPLOYMENT_NAME: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
    pub const OPENAI_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
    pub const OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
    pub const OPENAI_ACCESS_TOKEN: &str = "AZURE_OPENAI_ACCESS_TOKEN";
    pub const PROJECT_NAME: &str = "PROJECT_NAME";

    pub const RAG_OPENAI_ENDPOINT: &str = "OPEN_AI_ENDPOINT";
    pub const RAG_OPENAI_KEY: &str = "OPEN_AI_KEY";
    pub const RAG_CHAT_MODEL: &str = "CHAT_MODEL";
    pub const RAG_EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
    pub const SEARCH_ENDPOINT: &str = "SEARCH_ENDPOINT";
    pub const SEARCH_KEY: &str = "SEARCH_KEY";
    pub const INDEX_NAME: &str = "INDEX_NAME";
    pub const PORT: &str = "PORT";

    pub const LOG_LEVEL: &str = "LOG_LEVEL";
}

/// Endpoint value shipped in sample `.env` files; treated as unset.
pub const PLACEHOLDER_ENDPOINT: &str = "https://your-ai-project.cognitiveservices.azure.com/";

pub const DEFAULT_ASSISTANT_ID: &str = "asst_14scpW964zK5TSFzjpdek9jG";
pub const DEFAULT_AGENTS_API_VERSION: &str = "v1";
pub const DEFAULT_DEPLOYMENT_NAME: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_API_VERSION: &str = "2025-01-01-preview";
pub const DEFAULT_RAG_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_PROJECT_NAME: &str = "aiproject";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_PORT: u16 = 8000;

/// How requests authenticate against the hosted service.
///
/// Tokens are obtained elsewhere (CLI login, managed identity); this crate
/// only attaches them.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent as `Authorization: Bearer <token>`.
    Bearer(String),
    /// Sent as `api-key: <key>`.
    ApiKey(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer(_) => f.write_str("Bearer(***)"),
            Credential::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

impl Credential {
    fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        token_var: &str,
        key_var: &str,
    ) -> Option<Self> {
        non_empty(lookup(token_var))
            .map(Credential::Bearer)
            .or_else(|| non_empty(lookup(key_var)).map(Credential::ApiKey))
    }
}

/// Settings for the hosted agent service.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub endpoint: String,
    pub assistant_id: String,
    pub api_version: String,
    /// Budget for a run to reach a terminal state.
    pub timeout: Duration,
    /// Total attempts per remote call, including the first.
    pub max_retries: u32,
    pub credential: Option<Credential>,
}

impl AgentConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            assistant_id: DEFAULT_ASSISTANT_ID.to_string(),
            api_version: DEFAULT_AGENTS_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            credential: None,
        }
    }

    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, FoundryError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FoundryError> {
        let endpoint = non_empty(lookup(vars::PROJECT_ENDPOINT))
            .filter(|e| e != PLACEHOLDER_ENDPOINT)
            .ok_or_else(|| FoundryError::ConfigurationMissing(vars::PROJECT_ENDPOINT.to_string()))?;

        let mut config = Self::new(endpoint);
        if let Some(id) = non_empty(lookup(vars::ASSISTANT_ID)) {
            config.assistant_id = id;
        }
        if let Some(version) = non_empty(lookup(vars::AGENTS_API_VERSION)) {
            config.api_version = version;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, vars::REQUEST_TIMEOUT)? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>(&lookup, vars::MAX_RETRIES)? {
            config.max_retries = retries;
        }
        config.credential =
            Credential::from_lookup(&lookup, vars::AGENT_ACCESS_TOKEN, vars::AGENT_API_KEY);

        Ok(config)
    }

    pub fn with_assistant_id(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = assistant_id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    pub fn poller(&self) -> RunPoller {
        RunPoller::new(self.timeout)
    }
}

/// Settings for the chat completions API.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub endpoint: String,
    pub deployment_name: String,
    pub api_version: String,
    pub project_name: String,
    pub max_retries: u32,
    pub max_tokens: u32,
    pub temperature: f32,
    pub credential: Option<Credential>,
}

impl ChatConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            deployment_name: DEFAULT_DEPLOYMENT_NAME.to_string(),
            api_version: DEFAULT_OPENAI_API_VERSION.to_string(),
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            max_tokens: 800,
            temperature: 0.7,
            credential: None,
        }
    }

    pub fn from_env() -> Result<Self, FoundryError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FoundryError> {
        let endpoint = non_empty(lookup(vars::OPENAI_ENDPOINT))
            .or_else(|| non_empty(lookup(vars::CHAT_PROJECT_ENDPOINT)))
            .ok_or_else(|| FoundryError::ConfigurationMissing(vars::OPENAI_ENDPOINT.to_string()))?;

        let mut config = Self::new(endpoint);
        if let Some(name) = non_empty(lookup(vars::DEPLOYMENT_NAME)) {
            config.deployment_name = name;
        }
        if let Some(version) = non_empty(lookup(vars::OPENAI_API_VERSION)) {
            config.api_version = version;
        }
        if let Some(name) = non_empty(lookup(vars::PROJECT_NAME)) {
            config.project_name = name;
        }
        if let Some(retries) = parse_var::<u32>(&lookup, vars::MAX_RETRIES)? {
            config.max_retries = retries;
        }
        config.credential =
            Credential::from_lookup(&lookup, vars::OPENAI_ACCESS_TOKEN, vars::OPENAI_API_KEY);

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }
}

/// Settings for the search index backing retrieval-augmented chat.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub key: String,
    pub index_name: String,
    pub embedding_deployment: String,
}

/// Settings for the retrieval-augmented chat web demo.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chat: ChatConfig,
    pub search: SearchConfig,
    pub port: u16,
}

impl RagConfig {
    pub fn from_env() -> Result<Self, FoundryError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, FoundryError> {
        let required = |name: &str| {
            non_empty(lookup(name)).ok_or_else(|| FoundryError::ConfigurationMissing(name.to_string()))
        };

        let mut chat = ChatConfig::new(required(vars::RAG_OPENAI_ENDPOINT)?);
        chat.credential = Some(Credential::ApiKey(required(vars::RAG_OPENAI_KEY)?));
        chat.deployment_name = required(vars::RAG_CHAT_MODEL)?;
        chat.api_version = DEFAULT_RAG_API_VERSION.to_string();
        chat.max_tokens = 1000;

        let search = SearchConfig {
            endpoint: required(vars::SEARCH_ENDPOINT)?,
            key: required(vars::SEARCH_KEY)?,
            index_name: required(vars::INDEX_NAME)?,
            embedding_deployment: required(vars::RAG_EMBEDDING_MODEL)?,
        };

        let port = parse_var::<u16>(&lookup, vars::PORT)?.unwrap_or(DEFAULT_PORT);

        Ok(Self { chat, search, port })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, FoundryError> {
    match non_empty(lookup(name)) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| FoundryError::InvalidInput(format!("{name} must be a number, got '{raw}'"))),
        None => Ok(None),
    }
}
