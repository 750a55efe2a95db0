//! HTTP API v1: session, message, and context endpoints.
//!
//! All routes live under `/v1/workspaces/{workspace_id}/sessions`:
//!
//! - `POST   /`                                  Get or create a session
//! - `POST   /list`                              List sessions
//! - `PUT    /{session_id}`                      Update metadata / configuration
//! - `DELETE /{session_id}`                      Mark a session inactive
//! - `GET    /{session_id}/clone`                Clone, optionally up to `message_id`
//! - `GET    /{session_id}/peers`                List session peers
//! - `POST   /{session_id}/peers`                Add peers
//! - `PUT    /{session_id}/peers`                Replace peers
//! - `DELETE /{session_id}/peers`                Remove peers
//! - `GET    /{session_id}/peers/{peer_id}/config` Peer session config
//! - `POST   /{session_id}/peers/{peer_id}/config` Set peer session config
//! - `GET    /{session_id}/context`              Token-bounded context
//! - `POST   /{session_id}/messages`             Create a message batch
//! - `GET    /{session_id}/messages`             List messages
//! - `POST   /{session_id}/search`               Keyword search
//!
//! Every handler runs the scope guard before it touches a store. The
//! caller's [`CapabilityToken`] is placed in request extensions by the auth
//! middleware.

use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use colloquy_context::{ContextOptions, ContextPayload, token};
use colloquy_core::{
    CapabilityToken, Error, Message, MessageDraft, Session, SessionCreate, SessionPeerConfig,
    SessionUpdate, validate_resource_name,
};
use colloquy_security::{DenyReason, ScopeRequest, authorize};

use crate::SharedState;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery, OptionalJson};

/// Upper bound on messages per create request.
pub const MAX_BATCH_SIZE: usize = 100;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route(
            "/workspaces/{workspace_id}/sessions",
            post(get_or_create_session_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/list",
            post(list_sessions_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/{session_id}",
            axum::routing::put(update_session_handler).delete(delete_session_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/{session_id}/clone",
            get(clone_session_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/{session_id}/peers",
            get(list_peers_handler)
                .post(add_peers_handler)
                .put(set_peers_handler)
                .delete(remove_peers_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/{session_id}/peers/{peer_id}/config",
            get(get_peer_config_handler).post(set_peer_config_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/{session_id}/context",
            get(context_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/{session_id}/messages",
            post(create_messages_handler).get(list_messages_handler),
        )
        .route(
            "/workspaces/{workspace_id}/sessions/{session_id}/search",
            post(search_handler),
        )
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ListSessionsRequest {
    /// Metadata key/values a session must carry to be listed.
    #[serde(default)]
    filter: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct CloneQuery {
    #[serde(default)]
    message_id: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ContextQuery {
    #[serde(default)]
    tokens: Option<u32>,
    #[serde(default = "default_true")]
    summary: bool,
    #[serde(default)]
    force_new: bool,
}

impl From<ContextQuery> for ContextOptions {
    fn from(query: ContextQuery) -> Self {
        Self {
            token_limit: query.tokens,
            include_summary: query.summary,
            force_new: query.force_new,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateMessagesRequest {
    messages: Vec<MessageDraft>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    semantic: bool,
}

// ── Guard helpers ─────────────────────────────────────────────────────────

/// Run the scope guard for an operation on one existing session.
fn authorize_session(token: &CapabilityToken, workspace: &str, session: &str) -> ApiResult<()> {
    authorize(
        token,
        ScopeRequest::Explicit {
            workspace,
            session: Some(session),
        },
    )
    .into_result()?;
    Ok(())
}

fn authorize_peer(token: &CapabilityToken, workspace: &str, peer: &str) -> ApiResult<()> {
    authorize(token, ScopeRequest::Peer { workspace, peer }).into_result()?;
    Ok(())
}

fn validate_peer_names<'a>(names: impl IntoIterator<Item = &'a String>) -> ApiResult<()> {
    for name in names {
        validate_resource_name(name)?;
    }
    Ok(())
}

// ── Session handlers ──────────────────────────────────────────────────────

async fn get_or_create_session_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path(workspace_id): Path<String>,
    ApiJson(req): ApiJson<SessionCreate>,
) -> ApiResult<Json<Session>> {
    let effective = authorize(
        &token,
        ScopeRequest::GetOrCreate {
            workspace: &workspace_id,
            session: req.name.as_deref(),
        },
    )
    .into_result()?;
    // Admin tokens pass the guard without naming a session.
    let session_id =
        effective.ok_or_else(|| Error::Authorization(DenyReason::SessionMissing.to_string()))?;

    validate_resource_name(&workspace_id)?;
    validate_resource_name(&session_id)?;
    if let Some(peers) = &req.peer_names {
        validate_peer_names(peers.keys())?;
    }

    let session = state
        .sessions
        .get_or_create_session(&workspace_id, &session_id, req)
        .await?;

    info!(workspace = %workspace_id, session = %session_id, "Session ready");
    Ok(Json(session))
}

async fn list_sessions_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path(workspace_id): Path<String>,
    OptionalJson(req): OptionalJson<ListSessionsRequest>,
) -> ApiResult<Json<ListResponse<Session>>> {
    authorize(
        &token,
        ScopeRequest::Explicit {
            workspace: &workspace_id,
            session: None,
        },
    )
    .into_result()?;

    let sessions = state
        .sessions
        .list_sessions(&workspace_id, req.and_then(|r| r.filter).as_ref())
        .await?;
    Ok(Json(sessions.into()))
}

async fn update_session_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<SessionUpdate>,
) -> ApiResult<Json<Session>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    let session = state
        .sessions
        .update_session(&workspace_id, &session_id, req)
        .await?;

    info!(workspace = %workspace_id, session = %session_id, "Session updated");
    Ok(Json(session))
}

async fn delete_session_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
) -> ApiResult<Json<ActionResponse>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    state
        .sessions
        .delete_session(&workspace_id, &session_id)
        .await?;

    info!(workspace = %workspace_id, session = %session_id, "Session deleted");
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Session '{session_id}' deleted"),
    }))
}

async fn clone_session_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiQuery(query): ApiQuery<CloneQuery>,
) -> ApiResult<Json<Session>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    let cloned = state
        .sessions
        .clone_session(&workspace_id, &session_id, query.message_id.as_deref())
        .await?;

    info!(
        workspace = %workspace_id,
        session = %session_id,
        clone = %cloned.name,
        "Session cloned"
    );
    Ok(Json(cloned))
}

// ── Peer handlers ─────────────────────────────────────────────────────────

async fn list_peers_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
) -> ApiResult<Json<ListResponse<String>>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    let peers = state
        .sessions
        .session_peers(&workspace_id, &session_id)
        .await?;
    Ok(Json(peers.into()))
}

async fn add_peers_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiJson(peers): ApiJson<HashMap<String, SessionPeerConfig>>,
) -> ApiResult<Json<ListResponse<String>>> {
    authorize_session(&token, &workspace_id, &session_id)?;
    validate_peer_names(peers.keys())?;

    let added = peers.len();
    state
        .sessions
        .add_peers(&workspace_id, &session_id, peers)
        .await?;

    info!(workspace = %workspace_id, session = %session_id, added, "Peers added");
    let peers = state
        .sessions
        .session_peers(&workspace_id, &session_id)
        .await?;
    Ok(Json(peers.into()))
}

async fn set_peers_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiJson(peers): ApiJson<HashMap<String, SessionPeerConfig>>,
) -> ApiResult<Json<ListResponse<String>>> {
    authorize_session(&token, &workspace_id, &session_id)?;
    validate_peer_names(peers.keys())?;

    state
        .sessions
        .set_peers(&workspace_id, &session_id, peers)
        .await?;

    info!(workspace = %workspace_id, session = %session_id, "Peers replaced");
    let peers = state
        .sessions
        .session_peers(&workspace_id, &session_id)
        .await?;
    Ok(Json(peers.into()))
}

async fn remove_peers_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiJson(peers): ApiJson<Vec<String>>,
) -> ApiResult<Json<ListResponse<String>>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    state
        .sessions
        .remove_peers(&workspace_id, &session_id, &peers)
        .await?;

    info!(workspace = %workspace_id, session = %session_id, removed = peers.len(), "Peers removed");
    let peers = state
        .sessions
        .session_peers(&workspace_id, &session_id)
        .await?;
    Ok(Json(peers.into()))
}

async fn get_peer_config_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id, peer_id)): Path<(String, String, String)>,
) -> ApiResult<Json<SessionPeerConfig>> {
    authorize_session(&token, &workspace_id, &session_id)?;
    authorize_peer(&token, &workspace_id, &peer_id)?;

    let config = state
        .sessions
        .peer_config(&workspace_id, &session_id, &peer_id)
        .await?;
    Ok(Json(config))
}

async fn set_peer_config_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id, peer_id)): Path<(String, String, String)>,
    ApiJson(config): ApiJson<SessionPeerConfig>,
) -> ApiResult<Json<SessionPeerConfig>> {
    authorize_session(&token, &workspace_id, &session_id)?;
    authorize_peer(&token, &workspace_id, &peer_id)?;

    state
        .sessions
        .set_peer_config(&workspace_id, &session_id, &peer_id, config.clone())
        .await?;

    info!(workspace = %workspace_id, session = %session_id, peer = %peer_id, "Peer config set");
    Ok(Json(config))
}

// ── Context / message handlers ────────────────────────────────────────────

async fn context_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiQuery(query): ApiQuery<ContextQuery>,
) -> ApiResult<Json<ContextPayload>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    let payload = state
        .assembler
        .assemble(&workspace_id, &session_id, query.into())
        .await?;
    Ok(Json(payload))
}

async fn create_messages_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<CreateMessagesRequest>,
) -> ApiResult<Json<Vec<Message>>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    if req.messages.is_empty() || req.messages.len() > MAX_BATCH_SIZE {
        return Err(Error::Validation(format!(
            "a batch must hold 1-{MAX_BATCH_SIZE} messages, got {}",
            req.messages.len()
        ))
        .into());
    }

    let sealed = req
        .messages
        .into_iter()
        .map(token::seal)
        .collect::<Result<Vec<_>, _>>()?;

    let created = state
        .messages
        .create_messages(&workspace_id, &session_id, sealed)
        .await?;

    info!(
        workspace = %workspace_id,
        session = %session_id,
        count = created.len(),
        tokens = created.iter().map(|m| u64::from(m.token_count)).sum::<u64>(),
        "Messages created"
    );
    Ok(Json(created))
}

async fn list_messages_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
) -> ApiResult<Json<ListResponse<Message>>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    let messages = state
        .messages
        .list_messages(&workspace_id, &session_id)
        .await?;
    Ok(Json(messages.into()))
}

async fn search_handler(
    State(state): State<SharedState>,
    Extension(token): Extension<CapabilityToken>,
    Path((workspace_id, session_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<SearchRequest>,
) -> ApiResult<Json<ListResponse<Message>>> {
    authorize_session(&token, &workspace_id, &session_id)?;

    if req.query.trim().is_empty() {
        return Err(Error::Validation("search query must not be empty".into()).into());
    }

    let hits = state
        .messages
        .search_messages(&workspace_id, &session_id, &req.query, req.semantic)
        .await?;
    Ok(Json(hits.into()))
}
