//!
//! HTTP surface
//! ------------
//! Axum router exposing the issuer:
//!
//! - `GET /` health check
//! - `POST /` and `POST /{name}` issue a guest token for the default or named
//!   dashboard. The optional JSON body is the caller identity; without a body
//!   the configured default identity is used.
//!
//! Domain outcomes always come back as HTTP 200 with an `IssuanceResult` body.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{IssuanceResult, IssueError};
use crate::identity::CallerIdentity;
use crate::issuer::TokenIssuer;
use crate::platform::{PlatformClient, SupersetClient};

/// Read-only state shared by all handlers. Built once in [`AppState::initialize`]
/// (or by hand in tests) and never mutated afterwards.
pub struct AppState<C> {
    pub issuer: Arc<TokenIssuer<C>>,
    pub default_identity: Option<Arc<CallerIdentity>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self { issuer: self.issuer.clone(), default_identity: self.default_identity.clone() }
    }
}

impl<C: PlatformClient> AppState<C> {
    pub fn new(issuer: TokenIssuer<C>, default_identity: Option<CallerIdentity>) -> Self {
        Self { issuer: Arc::new(issuer), default_identity: default_identity.map(Arc::new) }
    }
}

impl AppState<SupersetClient> {
    /// Build the production state: one HTTP client, one issuer.
    pub fn initialize(cfg: &ServiceConfig) -> anyhow::Result<Self> {
        let client = SupersetClient::new(&cfg.superset, cfg.request_timeout).context("While building Superset client")?;
        let issuer = TokenIssuer::new(client, cfg.superset.clone()).with_elevated_locations(cfg.elevated_locations);
        Ok(Self::new(issuer, cfg.default_identity.clone()))
    }
}

pub fn router<C: PlatformClient + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/", get(|| async { "superset-guest-token ok" }).post(issue_default::<C>))
        .route("/{name}", post(issue_named::<C>))
        .with_state(state)
}

/// Decode the optional identity body. An empty body falls back to the default.
fn caller_identity<C>(state: &AppState<C>, body: &Bytes) -> Result<Arc<CallerIdentity>, IssueError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return state.default_identity.clone().ok_or_else(|| IssueError::validation("caller identity required"));
    }
    serde_json::from_slice::<CallerIdentity>(body)
        .map(Arc::new)
        .map_err(|e| IssueError::validation(format!("invalid caller identity: {}", e)))
}

async fn issue<C: PlatformClient>(state: AppState<C>, name: Option<String>, body: Bytes) -> Json<IssuanceResult> {
    let identity = match caller_identity(&state, &body) {
        Ok(id) => id,
        Err(e) => {
            warn!(target: "issuer", code = e.code_str(), "rejected request: {}", e);
            return Json(IssuanceResult::Failure { error: e.message().to_string() });
        }
    };
    Json(state.issuer.issue_guest_token(&identity, name.as_deref()).await)
}

async fn issue_default<C: PlatformClient>(State(state): State<AppState<C>>, body: Bytes) -> Json<IssuanceResult> {
    issue(state, None, body).await
}

async fn issue_named<C: PlatformClient>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Json<IssuanceResult> {
    issue(state, Some(name), body).await
}

/// Bind and serve until the process is stopped.
pub async fn run(cfg: ServiceConfig) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "superset-guest-token starting: superset_url={}, admin_user={}, http_port={}, timeout={:?}, elevated_locations={:?}, default_identity={}",
        cfg.superset.url,
        cfg.superset.username,
        cfg.http_port,
        cfg.request_timeout,
        cfg.elevated_locations,
        cfg.default_identity.as_ref().map(|i| i.username.as_str()).unwrap_or("<none>")
    );
    let state = AppState::initialize(&cfg)?;
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
