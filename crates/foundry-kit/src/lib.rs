//! 'foundry-kit' - Resilient clients for hosted agent and chat completion services.
//!
//! Calls to a hosted model service fail in three recurring ways: the network
//! or the service is briefly unavailable, a job takes an unknown amount of
//! time to finish, and the answer comes back as prose when JSON was asked
//! for. This crate provides one tool for each:
//!
//! - [`retry`]: exponential backoff with jitter for transient failures.
//! - [`run`]: polling a submitted run until it reaches a terminal state or a
//!   deadline passes.
//! - [`extract`]: strict JSON extraction with a keyword line-scan fallback.
//!
//! On top of these sit thin clients for the agent service ([`agents`]), the
//! chat completions API ([`chat`]) and retrieval-augmented chat ([`rag`]).
//! The REST transports are behind the default `http` feature.

pub mod agents;
pub mod chat;
pub mod config;
pub mod error;
pub mod extract;
pub mod observability;
pub mod rag;
pub mod retry;
pub mod run;

#[cfg(feature = "http")]
mod transport;

pub use agents::{AgentService, Diagnostics, WeatherAgent};
pub use chat::{ChatBackend, ChatMessage, ChatSession, Role};
pub use config::{AgentConfig, ChatConfig, Credential, RagConfig};
pub use error::FoundryError;
pub use extract::{WeatherReport, extract_structured};
pub use rag::{SearchDataSource, SessionStore};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use run::{RunHandle, RunOutcome, RunPoller, RunStatus};

#[cfg(feature = "http")]
pub use agents::FoundryAgentsClient;
#[cfg(feature = "http")]
pub use chat::AzureOpenAiChat;
