//! Optional HTTP surface (feature `http`), mirroring the stdio transport
//! byte-for-byte (§6, P7): `POST /jsonrpc` accepts the same envelopes as
//! stdio, `GET /health` surfaces the §4.15 snapshot, `GET /tools` surfaces
//! `tools/list`. Enabled by setting `HTTP_ADDR`; nothing about the stdio
//! core depends on this module being compiled in.

use crate::ltmc::engine::LtmcEngine;
use crate::ltmc::observability::{BreakerStates, StoreLiveness};
use crate::ltmc::rpc::protocol::JsonRpcRequest;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;

async fn jsonrpc(
    State(engine): State<Arc<LtmcEngine>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> (StatusCode, Json<Value>) {
    if engine.config.enable_auth {
        let expected = engine.config.api_token.as_deref().unwrap_or("");
        let provided = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or("");
        use subtle::ConstantTimeEq;
        let ok = provided.len() == expected.len()
            && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()));
        if !ok {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"success": false, "error": "unauthorized: missing or invalid bearer token"})),
            );
        }
    }
    let response = engine.dispatcher.handle(request).await;
    (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or(Value::Null)))
}

async fn health(State(engine): State<Arc<LtmcEngine>>) -> Json<Value> {
    let sync = &engine.state.sync;
    let breaker_state_name = |b: &crate::ltmc::store::breaker::CircuitBreaker| format!("{:?}", b.state()).to_lowercase();
    let store_liveness = StoreLiveness {
        relational: true,
        vector: !sync.vector.is_degraded(),
        #[cfg(feature = "graph")]
        graph: Some(sync.graph.is_some()),
        #[cfg(not(feature = "graph"))]
        graph: None,
        #[cfg(feature = "cache")]
        cache: Some(sync.cache.is_some()),
        #[cfg(not(feature = "cache"))]
        cache: None,
    };
    let breaker_states = BreakerStates {
        vector: breaker_state_name(&sync.vector_breaker),
        graph: breaker_state_name(&sync.graph_breaker),
        cache: breaker_state_name(&sync.cache_breaker),
    };
    let snapshot = engine.state.observability.health_snapshot(store_liveness, breaker_states);
    Json(serde_json::to_value(snapshot).unwrap_or(Value::Null))
}

async fn tools_list(State(engine): State<Arc<LtmcEngine>>) -> Json<Value> {
    let request = JsonRpcRequest {
        jsonrpc: Some("2.0".to_string()),
        id: Some(Value::Null),
        method: "tools/list".to_string(),
        params: Value::Null,
    };
    let response = engine.dispatcher.handle(request).await;
    Json(response.result.unwrap_or(Value::Array(Vec::new())))
}

/// Builds the router in isolation from binding a port, so tests can drive
/// it in-process with `tower::ServiceExt::oneshot` instead of a real socket.
pub fn router(engine: Arc<LtmcEngine>) -> Router {
    Router::new()
        .route("/jsonrpc", post(jsonrpc))
        .route("/health", get(health))
        .route("/tools", get(tools_list))
        .with_state(engine)
}

pub async fn serve(addr: &str, engine: Arc<LtmcEngine>) -> std::io::Result<()> {
    let app = router(engine);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("http surface listening on {addr}");
    axum::serve(listener, app).await
}
