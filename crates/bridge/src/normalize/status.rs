// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server status snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::to_value;

/// Live status object from the upstream status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub is_game_running: bool,
    pub is_game_paused: bool,
    pub tech_tier: i64,
    pub active_schematic: String,
    pub game_phase: String,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    #[serde(rename = "IsGameRunning", default)]
    is_game_running: bool,
    #[serde(rename = "IsGamePaused", default)]
    is_game_paused: bool,
    #[serde(rename = "TechTier", default)]
    tech_tier: i64,
    #[serde(rename = "ActiveSchematic", default)]
    active_schematic: String,
    #[serde(rename = "GamePhase", default)]
    game_phase: String,
}

pub fn status(body: &Value) -> anyhow::Result<Value> {
    let raw: RawStatus = serde_json::from_value(body.clone())
        .map_err(|e| anyhow::anyhow!("status: malformed upstream body: {e}"))?;
    to_value(Status {
        is_game_running: raw.is_game_running,
        is_game_paused: raw.is_game_paused,
        tech_tier: raw.tech_tier,
        active_schematic: raw.active_schematic,
        game_phase: raw.game_phase,
    })
}
