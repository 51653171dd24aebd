//! Web API for the retrieval-augmented travel assistant.
//!
//! Sessions live in memory for the lifetime of the process. The chat id is
//! returned in every chat response and sent back by the client in the
//! request body (or `chat_id` query parameter for history).

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use foundry_kit::chat::{AzureOpenAiChat, ChatBackend, ChatMessage};
use foundry_kit::config::{RagConfig, SearchConfig};
use foundry_kit::rag::{SearchDataSource, SessionStore, probe_search};
use foundry_kit::retry::RetryPolicy;
use foundry_kit::FoundryError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;
use uuid::Uuid;

const SERVICE_NAME: &str = "Margie's Travel RAG App";

/// Shared state for the web API.
pub struct AppState {
    pub sessions: SessionStore,
    pub backend: Arc<dyn ChatBackend>,
    pub policy: RetryPolicy,
    pub search: Option<SearchConfig>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    chat_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    chat_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
struct SessionRef {
    #[serde(default)]
    chat_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    messages: Vec<ChatMessage>,
    chat_id: Option<Uuid>,
}

/// Error body returned by every failing endpoint: `{"error": "..."}`.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<FoundryError> for ApiError {
    fn from(err: FoundryError) -> Self {
        match err {
            FoundryError::InvalidInput(message) => ApiError {
                status: StatusCode::BAD_REQUEST,
                message,
            },
            other => {
                tracing::error!(error = %other, code = %other.error_code(), "❌ Chat request failed");
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: format!("Sorry, I encountered an error: {other}"),
                }
            }
        }
    }
}

/// Build the axum router for the web API.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/clear", post(clear))
        .route("/api/history", get(history))
        .route("/api/test-search", get(test_search))
        .route("/health", get(health))
        .with_state(state)
}

/// Start the web API. `port` overrides the configured `PORT`.
pub async fn run_server(port: Option<u16>) -> anyhow::Result<ExitCode> {
    let config = RagConfig::from_env()?;
    let port = port.unwrap_or(config.port);
    let backend = AzureOpenAiChat::new(&config.chat)?.with_search(SearchDataSource::new(&config.search));

    let state = Arc::new(AppState {
        sessions: SessionStore::default(),
        backend: Arc::new(backend),
        policy: config.chat.retry_policy(),
        search: Some(config.search),
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "🚀 Travel assistant listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(ExitCode::SUCCESS)
}

// -- Handlers --

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "Message cannot be empty".to_string(),
        });
    }
    tracing::debug!(message, chat_id = ?req.chat_id, "Chat request");

    let reply = state
        .sessions
        .chat(req.chat_id, state.backend.as_ref(), &state.policy, message)
        .await?;

    Ok(Json(ChatResponse {
        response: reply.response,
        chat_id: reply.chat_id,
    }))
}

async fn clear(State(state): State<Arc<AppState>>, body: Bytes) -> Json<serde_json::Value> {
    let session: SessionRef = serde_json::from_slice(&body).unwrap_or_default();
    if let Some(chat_id) = session.chat_id {
        state.sessions.clear(chat_id).await;
    }
    Json(json!({ "success": true, "message": "Chat history cleared" }))
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(session): Query<SessionRef>,
) -> Json<HistoryResponse> {
    let messages = match session.chat_id {
        Some(chat_id) => state.sessions.history(chat_id).await,
        None => Vec::new(),
    };
    Json(HistoryResponse {
        messages,
        chat_id: session.chat_id,
    })
}

async fn test_search(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(search) = &state.search else {
        return Err(ApiError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "Search is not configured".to_string(),
        });
    };

    match probe_search(search, "Dubai", 3).await {
        Ok(probe) => Ok(Json(json!({
            "status": "success",
            "search_endpoint": search.endpoint,
            "index_name": search.index_name,
            "results_count": probe.documents.len(),
            "documents": probe.documents,
        }))),
        Err(e) => Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}
