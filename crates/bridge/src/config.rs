// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use crate::model::EventType;

/// Configuration for the bridge gateway.
#[derive(Debug, Clone, clap::Args)]
pub struct BridgeConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "SATBRIDGE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 9810, env = "SATBRIDGE_PORT")]
    pub port: u16,

    /// Store address (Redis URL).
    #[arg(long, default_value = "redis://127.0.0.1:6379", env = "SATBRIDGE_STORE_ADDRESS")]
    pub store_address: String,

    /// Timeout for every store operation, in milliseconds.
    #[arg(long, default_value_t = 2000, env = "SATBRIDGE_STORE_TIMEOUT_MS")]
    pub store_timeout_ms: u64,

    /// Stable replica name. Defaults to a random ULID per process.
    #[arg(long, env = "SATBRIDGE_NODE_NAME")]
    pub node_name: Option<String>,

    /// Lease TTL in seconds.
    #[arg(long, default_value_t = 15, env = "SATBRIDGE_LEASE_TTL_SECS")]
    pub lease_ttl_secs: u64,

    /// Lease renewal interval in seconds. Must stay below TTL/2.
    #[arg(long, default_value_t = 5, env = "SATBRIDGE_LEASE_RENEW_SECS")]
    pub lease_renew_secs: u64,

    /// History retention in game-seconds. 0 disables pruning.
    #[arg(long, default_value_t = 14400, env = "SATBRIDGE_MAX_SAMPLE_GAME_DURATION")]
    pub max_sample_game_duration: i64,

    /// Timeout for heavy upstream requests, in milliseconds.
    #[arg(long, default_value_t = 10000, env = "SATBRIDGE_UPSTREAM_TIMEOUT_MS")]
    pub upstream_timeout_ms: u64,

    /// Timeout for the status poll, in milliseconds.
    #[arg(long, default_value_t = 1000, env = "SATBRIDGE_STATUS_TIMEOUT_MS")]
    pub status_timeout_ms: u64,

    /// Consecutive status failures before a session is considered
    /// disconnected.
    #[arg(long, default_value_t = 3, env = "SATBRIDGE_DISCONNECT_THRESHOLD")]
    pub disconnect_threshold: u32,

    /// Cadence override, `type=millis` (repeatable). Applies to every
    /// session; per-session cadence is not supported.
    #[arg(long = "cadence", value_parser = parse_cadence, env = "SATBRIDGE_CADENCE", value_delimiter = ',')]
    pub cadence: Vec<(EventType, u64)>,

    /// Status cadence while a session is disconnected, in milliseconds.
    #[arg(long, default_value_t = 10000, env = "SATBRIDGE_LIGHT_POLL_MS")]
    pub light_poll_ms: u64,

    /// Reconciler interval in milliseconds.
    #[arg(long, default_value_t = 3000, env = "SATBRIDGE_RECONCILE_MS")]
    pub reconcile_ms: u64,

    /// Session-info probe interval in milliseconds.
    #[arg(long, default_value_t = 10000, env = "SATBRIDGE_SESSION_INFO_MS")]
    pub session_info_ms: u64,

    /// Slack in seconds before a shrinking play duration counts as a
    /// rollback. Zero treats any regression as one.
    #[arg(long, default_value_t = 0, env = "SATBRIDGE_ROLLBACK_TOLERANCE_SECS")]
    pub rollback_tolerance_secs: i64,
}

fn parse_cadence(s: &str) -> Result<(EventType, u64), String> {
    let (name, millis) = s
        .split_once('=')
        .ok_or_else(|| format!("expected type=millis, got {s:?}"))?;
    let ty = EventType::parse(name).ok_or_else(|| format!("unknown event type {name:?}"))?;
    let millis: u64 = millis
        .parse()
        .map_err(|_| format!("invalid cadence millis {millis:?}"))?;
    if millis == 0 {
        return Err("cadence must be positive".to_owned());
    }
    Ok((ty, millis))
}

impl BridgeConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    pub fn lease_renew_interval(&self) -> Duration {
        Duration::from_secs(self.lease_renew_secs)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn light_poll_interval(&self) -> Duration {
        Duration::from_millis(self.light_poll_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_ms)
    }

    pub fn session_info_interval(&self) -> Duration {
        Duration::from_millis(self.session_info_ms)
    }

    /// Cadence for one event type: the override when present, the
    /// baked-in default otherwise.
    pub fn cadence_for(&self, ty: EventType) -> Duration {
        self.cadence
            .iter()
            .rev()
            .find(|(t, _)| *t == ty)
            .map(|&(_, ms)| Duration::from_millis(ms))
            .unwrap_or_else(|| crate::upstream::schedule::default_cadence(ty))
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 9810,
            store_address: "redis://127.0.0.1:6379".to_owned(),
            store_timeout_ms: 2000,
            node_name: None,
            lease_ttl_secs: 15,
            lease_renew_secs: 5,
            max_sample_game_duration: 14400,
            upstream_timeout_ms: 10000,
            status_timeout_ms: 1000,
            disconnect_threshold: 3,
            cadence: Vec::new(),
            light_poll_ms: 10000,
            reconcile_ms: 3000,
            session_info_ms: 10000,
            rollback_tolerance_secs: 0,
        }
    }
}
