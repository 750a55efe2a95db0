//! HTTP API gateway for Colloquy.
//!
//! Exposes the health check and the v1 session API. Every `/v1` request is
//! authenticated by [`auth_middleware`], which turns the bearer token into a
//! [`CapabilityToken`] for the handlers' scope checks.
//!
//! Built on Axum.

pub mod api_v1;
pub mod error;
pub mod extract;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use colloquy_config::AppConfig;
use colloquy_context::ContextAssembler;
use colloquy_core::{CapabilityToken, Error, MessageStore, SessionStore, SummaryStore};
use colloquy_security::{CapabilityError, CapabilityVerifier, bearer_token};
use colloquy_store::InMemoryStore;

use crate::error::ApiError;

/// Default request body ceiling when no configuration is supplied.
const DEFAULT_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub sessions: Arc<dyn SessionStore>,
    pub messages: Arc<dyn MessageStore>,
    pub assembler: ContextAssembler,
    /// `None` when authentication is disabled.
    pub verifier: Option<CapabilityVerifier>,
    pub body_limit_bytes: usize,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire every store role to one backend, with default limits.
    pub fn with_store<S>(store: Arc<S>, verifier: Option<CapabilityVerifier>) -> Self
    where
        S: SessionStore + MessageStore + SummaryStore + 'static,
    {
        Self {
            assembler: ContextAssembler::new(store.clone(), store.clone()),
            sessions: store.clone(),
            messages: store,
            verifier,
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }

    /// Build state from configuration.
    pub fn from_config<S>(store: Arc<S>, config: &AppConfig) -> Result<Self, CapabilityError>
    where
        S: SessionStore + MessageStore + SummaryStore + 'static,
    {
        let verifier = if config.auth.enabled {
            Some(CapabilityVerifier::new(
                config.auth.jwt_secret.as_deref().unwrap_or_default(),
            )?)
        } else {
            warn!("Authentication disabled, every request is treated as admin");
            None
        };

        let mut state = Self::with_store(store, verifier);
        state.assembler = state
            .assembler
            .with_default_token_limit(config.context.default_max_tokens);
        state.body_limit_bytes = config.gateway.body_limit_bytes;
        Ok(state)
    }
}

/// Build the full router: health check plus the authenticated v1 API.
pub fn build_router(state: SharedState) -> Router {
    let body_limit = state.body_limit_bytes;
    let v1 = api_v1::v1_router(state.clone())
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server with the in-memory store.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(GatewayState::from_config(store, &config)?);
    let app = build_router(state);

    info!(
        addr = %addr,
        default_max_tokens = config.context.default_max_tokens,
        auth = config.auth.enabled,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Authentication middleware for the /v1 API.
///
/// Requires `Authorization: Bearer <jwt>` and stores the decoded
/// [`CapabilityToken`] in request extensions. With authentication disabled
/// every request carries an admin capability.
async fn auth_middleware(
    State(state): State<SharedState>,
    mut req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, ApiError> {
    let capability = match &state.verifier {
        None => CapabilityToken::admin(),
        Some(verifier) => {
            let raw = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(bearer_token)
                .ok_or_else(|| Error::Authorization("missing bearer token".into()))?;

            verifier.verify(raw).map_err(|e| {
                warn!(error = %e, "Rejected capability token");
                Error::Authorization(e.to_string())
            })?
        }
    };

    req.extensions_mut().insert(capability);
    Ok(next.run(req).await)
}
