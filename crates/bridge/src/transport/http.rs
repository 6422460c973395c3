// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST handlers: session CRUD, latest-state read, history query.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::model::{EventType, Session};
use crate::store::{keys, Store};

use super::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub is_paused: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    #[serde(default)]
    pub save: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "type")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub save: Option<String>,
    #[serde(default)]
    pub since: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub data_type: EventType,
    pub save_name: String,
    pub latest_id: i64,
    pub points: Vec<HistoryPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub game_time_id: i64,
    pub data: Value,
}

// -- Helpers ------------------------------------------------------------------

pub(crate) async fn load_session(store: &Store, id: &str) -> Result<Session, ApiError> {
    let raw = store
        .get(&keys::session(id))
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("session {id} not found")))?;
    serde_json::from_str(&raw)
        .map_err(|e| ApiError::Internal(format!("corrupt session record: {e}")))
}

async fn load_all_sessions(store: &Store) -> Result<Vec<Session>, ApiError> {
    let mut sessions = Vec::new();
    for key in store.scan_keys(keys::SESSION_PATTERN).await.map_err(ApiError::from)? {
        let Some(raw) = store.get(&key).await.map_err(ApiError::from)? else {
            continue;
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => sessions.push(session),
            Err(e) => tracing::warn!(key = %key, err = %e, "skipping corrupt session record"),
        }
    }
    Ok(sessions)
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_owned()));
    }
    Ok(())
}

fn validate_address(address: &str) -> Result<(), ApiError> {
    let url = reqwest::Url::parse(address)
        .map_err(|e| ApiError::BadRequest(format!("invalid address: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ApiError::BadRequest("address must be an http(s) URL".to_owned()));
    }
    Ok(())
}

async fn reject_duplicate_name(
    store: &Store,
    name: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    for existing in load_all_sessions(store).await? {
        if existing.name == name && Some(existing.id.as_str()) != exclude_id {
            return Err(ApiError::Conflict(format!("session name {name:?} already in use")));
        }
    }
    Ok(())
}

async fn persist(store: &Store, session: &Session) -> Result<(), ApiError> {
    let raw = serde_json::to_string(session)
        .map_err(|e| ApiError::Internal(format!("failed to encode session: {e}")))?;
    store.set(&keys::session(&session.id), &raw, None).await.map_err(ApiError::from)
}

// -- Handlers -----------------------------------------------------------------

/// `POST /v1/sessions`
pub async fn create_session(
    State(s): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    validate_name(&req.name)?;
    validate_address(&req.address)?;
    reject_duplicate_name(&s.store, &req.name, None).await?;

    let id = uuid::Uuid::new_v4().to_string();
    let session = Session::new(id, req.name, req.address.trim_end_matches('/').to_owned());
    persist(&s.store, &session).await?;
    tracing::info!(session_id = %session.id, name = %session.name, "session created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /v1/sessions`
pub async fn list_sessions(
    State(s): State<Arc<AppState>>,
) -> Result<Json<Vec<Session>>, ApiError> {
    let mut sessions = load_all_sessions(&s.store).await?;
    sessions.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(sessions))
}

/// `GET /v1/sessions/{id}`
pub async fn get_session(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(load_session(&s.store, &id).await?))
}

/// `PATCH /v1/sessions/{id}`
pub async fn update_session(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<Session>, ApiError> {
    let mut session = load_session(&s.store, &id).await?;

    if let Some(name) = req.name {
        validate_name(&name)?;
        if name != session.name {
            reject_duplicate_name(&s.store, &name, Some(&id)).await?;
        }
        session.name = name;
    }
    if let Some(address) = req.address {
        validate_address(&address)?;
        session.address = address.trim_end_matches('/').to_owned();
    }
    if let Some(is_paused) = req.is_paused {
        session.is_paused = is_paused;
    }

    persist(&s.store, &session).await?;
    tracing::info!(session_id = %id, "session updated");
    Ok(Json(session))
}

/// `DELETE /v1/sessions/{id}` — removes the session plus every cache,
/// history, and lease key under it.
pub async fn delete_session(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    load_session(&s.store, &id).await?;

    s.store.del(&keys::session(&id)).await.map_err(ApiError::from)?;
    for pattern in [keys::state_pattern(&id), keys::history_pattern(&id)] {
        for key in s.store.scan_keys(&pattern).await.map_err(ApiError::from)? {
            s.store.del(&key).await.map_err(ApiError::from)?;
        }
    }
    s.store.del(&keys::lease(&id)).await.map_err(ApiError::from)?;

    tracing::info!(session_id = %id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /v1/sessions/{id}/state?save=` — the aggregated latest-state
/// object. Missing fields come back as empty lists/objects, never null.
pub async fn session_state(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<StateQuery>,
) -> Result<Json<Value>, ApiError> {
    let session = load_session(&s.store, &id).await?;
    let save = query.save.unwrap_or(session.save_name);

    let mut state = serde_json::Map::new();
    for ty in EventType::ALL {
        if !ty.cacheable() {
            continue;
        }
        let cached = s
            .store
            .get(&keys::state(&id, &save, ty))
            .await
            .map_err(ApiError::from)?
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let value = cached.unwrap_or_else(|| empty_value(ty));
        state.insert(ty.as_str().to_owned(), value);
    }
    Ok(Json(Value::Object(state)))
}

fn empty_value(ty: EventType) -> Value {
    if ty.object_shaped() {
        Value::Object(serde_json::Map::new())
    } else {
        Value::Array(Vec::new())
    }
}

/// `GET /v1/sessions/{id}/history?type=X&save=S&since=N` — time-indexed
/// points in ascending `gameTimeId` order; `since` is exclusive.
pub async fn session_history(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let session = load_session(&s.store, &id).await?;
    let type_name = query
        .data_type
        .ok_or_else(|| ApiError::BadRequest("missing type parameter".to_owned()))?;
    let data_type = EventType::parse(&type_name)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown event type {type_name:?}")))?;
    let save = query.save.unwrap_or(session.save_name);
    let since = query.since.unwrap_or(0);

    let index_key = keys::history(&id, &save, data_type);
    let members = s
        .store
        .zrange_by_score(&index_key, i64::MIN, i64::MAX)
        .await
        .map_err(ApiError::from)?;

    let latest_id = members
        .last()
        .and_then(|m| m.parse::<i64>().ok())
        .unwrap_or(0);

    let mut points = Vec::new();
    for member in &members {
        let Ok(game_time_id) = member.parse::<i64>() else {
            continue;
        };
        if game_time_id <= since {
            continue;
        }
        let Some(raw) = s
            .store
            .get(&keys::history_data(&id, &save, data_type, game_time_id))
            .await
            .map_err(ApiError::from)?
        else {
            continue;
        };
        let data = serde_json::from_str(&raw).unwrap_or(Value::Null);
        points.push(HistoryPoint { game_time_id, data });
    }

    Ok(Json(HistoryResponse { data_type, save_name: save, latest_id, points }))
}
