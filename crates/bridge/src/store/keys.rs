// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key layout for the KV store. Every key string in the system is built
//! here so the namespace stays greppable.

use crate::model::EventType;

pub fn session(id: &str) -> String {
    format!("session:{id}")
}

pub const SESSION_PATTERN: &str = "session:*";

pub fn lease(session_id: &str) -> String {
    format!("lease:{session_id}")
}

pub fn heartbeat(instance_id: &str) -> String {
    format!("heartbeat:{instance_id}")
}

pub fn state(session_id: &str, save_name: &str, event_type: EventType) -> String {
    format!("state:{session_id}:{save_name}:{event_type}")
}

pub fn state_pattern(session_id: &str) -> String {
    format!("state:{session_id}:*")
}

pub fn history(session_id: &str, save_name: &str, data_type: EventType) -> String {
    format!("history:{session_id}:{save_name}:{data_type}")
}

pub fn history_data(
    session_id: &str,
    save_name: &str,
    data_type: EventType,
    game_time_id: i64,
) -> String {
    format!("history:{session_id}:{save_name}:{data_type}:data:{game_time_id}")
}

pub fn history_pattern(session_id: &str) -> String {
    format!("history:{session_id}:*")
}

/// Pub/sub channel carrying canonical events for one session.
pub fn events_channel(session_id: &str) -> String {
    format!("events:{session_id}")
}
