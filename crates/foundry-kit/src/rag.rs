//! Retrieval-augmented chat: search grounding and per-visitor sessions.
//!
//! A [`SearchDataSource`] is attached to the chat backend and serialized
//! into the `data_sources` extension of every completion request. The
//! [`SessionStore`] keeps one [`ChatSession`] per chat id for the lifetime
//! of the process.

use crate::chat::{ChatBackend, ChatMessage, ChatSession};
use crate::config::SearchConfig;
use crate::error::FoundryError;
use crate::retry::RetryPolicy;
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

pub const TRAVEL_ASSISTANT_PROMPT: &str = "You are a friendly travel assistant for Margie's Travel. \
You help customers find the perfect travel experiences using our comprehensive travel database. \
Be helpful, enthusiastic, and provide detailed information about destinations, accommodations, \
and travel services.";

/// Search index used to ground completions.
#[derive(Clone, PartialEq)]
pub struct SearchDataSource {
    pub endpoint: String,
    pub index_name: String,
    pub key: String,
    /// Embedding model deployment used for vector queries.
    pub embedding_deployment: String,
    /// How aggressively retrieved documents are filtered, 1 (loose) to 5.
    pub strictness: u8,
    /// Restrict answers to the retrieved documents.
    pub in_scope: bool,
    pub query_type: String,
}

impl SearchDataSource {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            index_name: config.index_name.clone(),
            key: config.key.clone(),
            embedding_deployment: config.embedding_deployment.clone(),
            strictness: 3,
            in_scope: true,
            query_type: "simple".to_string(),
        }
    }

    pub fn with_strictness(mut self, strictness: u8) -> Self {
        self.strictness = strictness.clamp(1, 5);
        self
    }

    pub fn with_query_type(mut self, query_type: impl Into<String>) -> Self {
        self.query_type = query_type.into();
        self
    }
}

impl fmt::Debug for SearchDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchDataSource")
            .field("endpoint", &self.endpoint)
            .field("index_name", &self.index_name)
            .field("key", &"***")
            .field("embedding_deployment", &self.embedding_deployment)
            .field("strictness", &self.strictness)
            .field("in_scope", &self.in_scope)
            .field("query_type", &self.query_type)
            .finish()
    }
}

impl Serialize for SearchDataSource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        let parameters = serde_json::json!({
            "endpoint": self.endpoint,
            "index_name": self.index_name,
            "authentication": {
                "type": "api_key",
                "key": self.key,
            },
            "query_type": self.query_type,
            "in_scope": self.in_scope,
            "strictness": self.strictness,
            "embedding_dependency": {
                "type": "deployment_name",
                "deployment_name": self.embedding_deployment,
            },
        });

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "azure_search")?;
        map.serialize_entry("parameters", &parameters)?;
        map.end()
    }
}

/// Reply to one chat turn in a stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub chat_id: Uuid,
    pub response: String,
}

/// Sessions kept before the least recently used one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

struct SessionSlot {
    session: Arc<Mutex<ChatSession>>,
    last_used: Instant,
}

/// In-memory chat sessions keyed by chat id.
///
/// Turns on the same chat id run one at a time. A session is stored only
/// once its first turn succeeds, and the least recently used session is
/// evicted when the store is full.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
    system_prompt: String,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(TRAVEL_ASSISTANT_PROMPT)
    }
}

impl SessionStore {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            system_prompt: system_prompt.into(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Looks up a stored session, marking it as used.
    async fn checkout(&self, chat_id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.lock().await;
        let slot = sessions.get_mut(&chat_id)?;
        slot.last_used = Instant::now();
        Some(slot.session.clone())
    }

    async fn insert(&self, chat_id: Uuid, session: Arc<Mutex<ChatSession>>) {
        let mut sessions = self.sessions.lock().await;
        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                info!(chat_id = %oldest, "Evicted chat session");
            }
        }
        sessions.insert(
            chat_id,
            SessionSlot {
                session,
                last_used: Instant::now(),
            },
        );
        info!(%chat_id, "Created chat session");
    }

    /// Runs one chat turn against the stored session.
    ///
    /// An absent or unknown `chat_id` starts a fresh session under a new id.
    /// The store lock is not held while the backend is called; the session
    /// lock is, so concurrent turns on one id are applied in order.
    pub async fn chat<B: ChatBackend + ?Sized>(
        &self,
        chat_id: Option<Uuid>,
        backend: &B,
        policy: &RetryPolicy,
        message: &str,
    ) -> Result<ChatReply, FoundryError> {
        if message.trim().is_empty() {
            return Err(FoundryError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }

        let existing = match chat_id {
            Some(id) => self.checkout(id).await.map(|session| (id, session)),
            None => None,
        };
        let (chat_id, session, is_new) = match existing {
            Some((id, session)) => (id, session, false),
            None => {
                let fresh = ChatSession::with_system_prompt(self.system_prompt.clone());
                (Uuid::new_v4(), Arc::new(Mutex::new(fresh)), true)
            }
        };

        let response = session.lock().await.send(backend, policy, message).await?;

        if is_new {
            self.insert(chat_id, session).await;
        }
        debug!(%chat_id, "Stored chat turn");
        Ok(ChatReply { chat_id, response })
    }

    /// Forgets the session. Returns whether it existed.
    pub async fn clear(&self, chat_id: Uuid) -> bool {
        let removed = self.sessions.lock().await.remove(&chat_id).is_some();
        if removed {
            info!(%chat_id, "Cleared chat session");
        }
        removed
    }

    /// User and assistant turns of the session; empty for unknown ids.
    pub async fn history(&self, chat_id: Uuid) -> Vec<ChatMessage> {
        let session = self
            .sessions
            .lock()
            .await
            .get(&chat_id)
            .map(|slot| slot.session.clone());
        match session {
            Some(session) => session.lock().await.history().to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

/// Outcome of a direct query against the search index.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchProbe {
    #[serde(default, rename = "value")]
    pub documents: Vec<serde_json::Value>,
}

/// Queries the index directly, bypassing the model, to check that search is
/// reachable and returns documents.
#[cfg(feature = "http")]
pub async fn probe_search(
    config: &SearchConfig,
    query: &str,
    top: u32,
) -> Result<SearchProbe, FoundryError> {
    use crate::config::Credential;
    use crate::transport;
    use std::time::Duration;

    const SEARCH_API_VERSION: &str = "2021-04-30-Preview";

    let base = transport::base_url(&config.endpoint)?;
    let mut url = transport::join(
        &base,
        &format!("indexes/{}/docs", config.index_name),
        SEARCH_API_VERSION,
    )?;
    url.query_pairs_mut()
        .append_pair("search", query)
        .append_pair("top", &top.to_string());

    let client = transport::build_client(Duration::from_secs(30))?;
    let credential = Credential::ApiKey(config.key.clone());
    let request = transport::authorize(client.get(url), Some(&credential));
    let probe: SearchProbe = transport::send_json(request, "Search").await?;

    info!(
        index = %config.index_name,
        results = probe.documents.len(),
        "Search probe succeeded"
    );
    Ok(probe)
}
