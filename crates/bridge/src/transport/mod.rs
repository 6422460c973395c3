// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + SSE transport for the bridge.

pub mod http;
pub mod sse;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::config::BridgeConfig;
use crate::store::Store;

/// State shared by the HTTP handlers. Read endpoints hit the store
/// directly; the publishers run independently of the HTTP surface.
pub struct AppState {
    pub store: Store,
    pub config: Arc<BridgeConfig>,
}

/// Build the axum `Router` with all bridge routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/sessions", get(http::list_sessions).post(http::create_session))
        .route(
            "/v1/sessions/{id}",
            get(http::get_session).patch(http::update_session).delete(http::delete_session),
        )
        .route("/v1/sessions/{id}/state", get(http::session_state))
        .route("/v1/sessions/{id}/history", get(http::session_history))
        .route("/v1/sessions/{id}/events", get(sse::session_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
