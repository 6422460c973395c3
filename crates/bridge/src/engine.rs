// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-event dispatch for one session.
//!
//! Every event produced by the pollers runs the same gated sequence:
//! deletion check, ownership gate, game-time-indexed history write,
//! latest-state cache write, publish. The cache write always precedes
//! the publish, so a subscriber that re-reads after a frame observes
//! that frame's state.

use std::sync::Arc;

use crate::lease::LeaseCoordinator;
use crate::model::{Event, Session};
use crate::store::{keys, Store};

/// What the publisher loop should do after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    /// The lease is definitively gone; stop the publisher.
    Stop,
}

pub struct Engine {
    store: Store,
    coordinator: Arc<LeaseCoordinator>,
    session_id: String,
    retention_secs: i64,
}

impl Engine {
    pub fn new(
        store: Store,
        coordinator: Arc<LeaseCoordinator>,
        session_id: String,
        retention_secs: i64,
    ) -> Self {
        Self { store, coordinator, session_id, retention_secs }
    }

    /// Handle one event. `save_name` and `game_time` are the publisher's
    /// current view; an empty save name suppresses keyed writes but not
    /// the publish.
    pub async fn dispatch(&self, save_name: &str, game_time: i64, mut event: Event) -> Dispatch {
        let id = self.session_id.as_str();

        match self.store.exists(&keys::session(id)).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(session_id = %id, "session deleted, dropping event");
                return Dispatch::Continue;
            }
            Err(e) => {
                tracing::warn!(session_id = %id, err = %e, "store unreachable, skipping event");
                return Dispatch::Continue;
            }
        }

        if !self.coordinator.is_owned(id).await {
            if self.coordinator.is_uncertain(id).await {
                tracing::debug!(session_id = %id, "lease uncertain, pausing writes");
                return Dispatch::Continue;
            }
            tracing::info!(session_id = %id, "lease lost, stopping publisher");
            return Dispatch::Stop;
        }

        if event.event_type.history_enabled() && !save_name.is_empty() && game_time > 0 {
            event.game_time_id = Some(game_time);
            if let Err(e) = self.write_history(save_name, &event, game_time).await {
                tracing::warn!(
                    session_id = %id,
                    event_type = %event.event_type,
                    err = %e,
                    "history write failed, skipping event"
                );
                return Dispatch::Continue;
            }
        }

        if event.event_type.cacheable() && !save_name.is_empty() {
            let key = keys::state(id, save_name, event.event_type);
            let payload = event.data.to_string();
            if let Err(e) = self.store.set(&key, &payload, None).await {
                tracing::warn!(
                    session_id = %id,
                    event_type = %event.event_type,
                    err = %e,
                    "cache write failed, skipping publish"
                );
                return Dispatch::Continue;
            }
        }

        match serde_json::to_vec(&event) {
            Ok(frame) => {
                if let Err(e) = self.store.publish(&keys::events_channel(id), &frame).await {
                    tracing::warn!(session_id = %id, err = %e, "publish failed");
                }
            }
            Err(e) => {
                tracing::error!(session_id = %id, err = %e, "failed to encode event");
            }
        }

        if event.event_type == crate::model::EventType::ApiStatus {
            let online = event
                .data
                .get("isOnline")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if let Err(e) = update_session(&self.store, id, |s| s.is_online = online).await {
                tracing::warn!(session_id = %id, err = %e, "failed to update online flag");
            }
        }

        Dispatch::Continue
    }

    /// Append a time-indexed point and prune past the retention window.
    /// The sorted-set member IS the stringified game time, so a rollback
    /// reinsertion overwrites instead of duplicating.
    async fn write_history(
        &self,
        save_name: &str,
        event: &Event,
        game_time: i64,
    ) -> anyhow::Result<()> {
        let id = self.session_id.as_str();
        let ty = event.event_type;
        let index_key = keys::history(id, save_name, ty);

        self.store.zadd(&index_key, game_time, &game_time.to_string()).await?;
        self.store
            .set(&keys::history_data(id, save_name, ty, game_time), &event.data.to_string(), None)
            .await?;

        if self.retention_secs > 0 {
            let cutoff = game_time - self.retention_secs;
            let stale = self.store.zrange_by_score(&index_key, i64::MIN, cutoff).await?;
            for member in &stale {
                if let Ok(stale_id) = member.parse::<i64>() {
                    self.store
                        .del(&keys::history_data(id, save_name, ty, stale_id))
                        .await?;
                }
            }
            if !stale.is_empty() {
                self.store.zrem_range_by_score(&index_key, i64::MIN, cutoff).await?;
            }
        }
        Ok(())
    }
}

/// Read-modify-write a session record. Returns the updated record, or
/// `None` when the session no longer exists.
pub async fn update_session(
    store: &Store,
    session_id: &str,
    mutate: impl FnOnce(&mut Session),
) -> anyhow::Result<Option<Session>> {
    let key = keys::session(session_id);
    let Some(raw) = store.get(&key).await? else {
        return Ok(None);
    };
    let mut session: Session = serde_json::from_str(&raw)?;
    mutate(&mut session);
    store.set(&key, &serde_json::to_string(&session)?, None).await?;
    Ok(Some(session))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
