// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-format records shared by the store, the polling engine, and the
//! HTTP surface.

pub mod event;

use serde::{Deserialize, Serialize};

pub use event::{Event, EventType};

/// A configured pointer to one upstream game server.
///
/// Stored JSON-encoded at `session:{id}`. Mutated by the HTTP surface
/// (name/address/pause), the session manager (disconnection flag), and the
/// polling engine (online flag, save name).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub is_paused: bool,
    #[serde(default)]
    pub is_disconnected: bool,
    #[serde(default)]
    pub is_online: bool,
    /// Most recently observed save identifier; empty until the first
    /// successful session-info probe.
    #[serde(default)]
    pub save_name: String,
}

impl Session {
    pub fn new(id: String, name: String, address: String) -> Self {
        Self {
            id,
            name,
            address,
            is_paused: false,
            is_disconnected: false,
            is_online: false,
            save_name: String::new(),
        }
    }
}

/// Advisory lock value stored at `lease:{sessionId}` with a matching
/// store-side TTL. Staleness is judged by the store expiring the key,
/// never by comparing `renewed_at` against a local clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub session_id: String,
    pub owner_id: String,
    pub acquired_at: u64,
    pub renewed_at: u64,
    /// TTL in seconds, mirrored into the store-side expiry.
    pub ttl: u64,
}

/// Replica liveness record at `heartbeat:{instanceId}`, refreshed on the
/// lease renewal cadence with the lease TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub instance_id: String,
    pub started_at: u64,
    pub renewed_at: u64,
}

/// One-shot result of the upstream session-info probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub save_name: String,
    /// Total in-game play time in seconds.
    pub total_play_duration: i64,
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
