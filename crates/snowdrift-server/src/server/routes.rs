//! Request handlers and content negotiation.
//!
//! A single generation route serves all three encodings, selected on the
//! `Accept` header the way the original wire contract demands: protobuf is
//! the only encoding that can return more than one ID, JSON wraps a single
//! ID in a one-field object, and anything else gets plain decimal text.

use crate::server::config::ServerConfig;
use crate::server::error::ApiError;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use snowdrift::{AgentPolicy, AllowAll, IdEngine, SystemClock, UserAgentPolicy};
use snowdrift_wire::{APPLICATION_JSON, APPLICATION_PROTOBUF, IdBatch, IdBody, NO_CACHE, TEXT_PLAIN};
use std::sync::Arc;

/// The policy selected by `validate_caller_identity`, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub enum CallerPolicy {
    Open,
    ValidateUserAgent,
}

impl AgentPolicy for CallerPolicy {
    fn is_allowed(&self, caller: Option<&str>) -> bool {
        match self {
            Self::Open => AllowAll.is_allowed(caller),
            Self::ValidateUserAgent => UserAgentPolicy.is_allowed(caller),
        }
    }
}

/// The engine variant the server runs: production clock, startup-selected
/// policy.
pub type Engine = IdEngine<SystemClock, CallerPolicy>;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
    max_batch_size: usize,
}

/// Builds the router and its engine from a validated configuration.
pub fn build_router(config: &ServerConfig) -> Router {
    let policy = if config.validate_caller_identity {
        CallerPolicy::ValidateUserAgent
    } else {
        CallerPolicy::Open
    };
    let engine = Arc::new(IdEngine::with_parts(config.node, SystemClock, policy));
    router_with_engine(engine, config.max_batch_size)
}

/// Builds the router around an existing engine. Useful for tests that need
/// access to the engine's metrics.
pub fn router_with_engine(engine: Arc<Engine>, max_batch_size: usize) -> Router {
    Router::new()
        .route("/", get(generate))
        .route("/ping", get(ping))
        .route("/version", get(version))
        .route("/healthcheck", get(healthcheck))
        .route("/metrics", get(metrics))
        .with_state(AppState {
            engine,
            max_batch_size,
        })
}

#[derive(Debug, Deserialize)]
struct GenerateParams {
    /// Number of IDs requested; only honored by the protobuf encoding.
    #[serde(default = "default_count")]
    count: usize,
}

fn default_count() -> usize {
    1
}

enum Encoding {
    Text,
    Json,
    Protobuf,
}

fn negotiate(accept: &str) -> Encoding {
    if accept.contains(APPLICATION_PROTOBUF) {
        Encoding::Protobuf
    } else if accept.contains(APPLICATION_JSON) {
        Encoding::Json
    } else {
        Encoding::Text
    }
}

async fn generate(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let caller = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match negotiate(accept) {
        Encoding::Text => {
            let id = state.engine.next_id(caller.as_deref())?;
            Ok(uncached(TEXT_PLAIN, id.to_string()))
        }
        Encoding::Json => {
            let id = state.engine.next_id(caller.as_deref())?;
            Ok(uncached_json(IdBody { id }))
        }
        Encoding::Protobuf => {
            let count = params.count.clamp(1, state.max_batch_size);
            // A large batch can spend whole milliseconds in sequence
            // exhaustion waits; keep that off the async runtime.
            let engine = Arc::clone(&state.engine);
            let ids = tokio::task::spawn_blocking(move || {
                let mut ids = Vec::with_capacity(count);
                for _ in 0..count {
                    ids.push(engine.next_id(caller.as_deref())?);
                }
                Ok::<_, snowdrift::Error>(ids)
            })
            .await
            .map_err(|join| ApiError::Internal(join.to_string()))??;

            use prost::Message;
            let body = IdBatch { ids }.encode_to_vec();
            Ok(uncached(APPLICATION_PROTOBUF, body))
        }
    }
}

fn uncached(content_type: &'static str, body: impl IntoResponse) -> Response {
    (
        [
            (header::CACHE_CONTROL, NO_CACHE),
            (header::CONTENT_TYPE, content_type),
        ],
        body,
    )
        .into_response()
}

fn uncached_json(body: IdBody) -> Response {
    ([(header::CACHE_CONTROL, NO_CACHE)], Json(body)).into_response()
}

async fn ping() -> &'static str {
    "pong"
}

async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "healthy": true }))
}

async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.engine.metrics();
    Json(serde_json::json!({
        "datacenter_id": snapshot.datacenter_id,
        "worker_id": snapshot.worker_id,
        "ids_issued": snapshot.ids_issued,
        "rollback_rejections": snapshot.rollback_rejections,
        "exhaustion_waits": snapshot.exhaustion_waits,
    }))
}
