// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed lease coordinator.
//!
//! One advisory lock per session, stored with a short TTL and renewed by
//! a background task at an interval below TTL/2. The CAS on the store is
//! the source of truth; local bookkeeping is a cache. Takeover relies on
//! the store expiring the key — replicas never judge staleness with
//! their own clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::model::{epoch_ms, Heartbeat, Lease};
use crate::store::{keys, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeaseHealth {
    /// Last renewal succeeded at this instant.
    Owned(Instant),
    /// Renewal has been failing since this instant; writes are paused
    /// until it succeeds again or the TTL elapses.
    Uncertain(Instant),
}

struct LeaseLocal {
    /// Lease JSON as last written; the CAS expectation for renewal.
    value: String,
    health: LeaseHealth,
}

pub struct LeaseCoordinator {
    store: Store,
    instance_id: String,
    ttl: Duration,
    renew_interval: Duration,
    started_at: u64,
    leases: Mutex<HashMap<String, LeaseLocal>>,
    cancel: CancellationToken,
}

impl LeaseCoordinator {
    pub fn new(store: Store, config: &BridgeConfig, shutdown: CancellationToken) -> Arc<Self> {
        let instance_id = config
            .node_name
            .clone()
            .unwrap_or_else(|| ulid::Ulid::new().to_string());
        Arc::new(Self {
            store,
            instance_id,
            ttl: config.lease_ttl(),
            renew_interval: config.lease_renew_interval(),
            started_at: epoch_ms(),
            leases: Mutex::new(HashMap::new()),
            cancel: shutdown.child_token(),
        })
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Spawn the background renewal task.
    pub fn spawn_renewal(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.renew_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = coordinator.cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }
                coordinator.renew_now().await;
            }
        });
    }

    /// Attempt to take the lease for a session. Succeeds only when the
    /// key is absent or the store expired it; a held lease returns
    /// `false` without error.
    pub async fn try_acquire(&self, session_id: &str) -> anyhow::Result<bool> {
        let now = epoch_ms();
        let lease = Lease {
            session_id: session_id.to_owned(),
            owner_id: self.instance_id.clone(),
            acquired_at: now,
            renewed_at: now,
            ttl: self.ttl.as_secs(),
        };
        let value = serde_json::to_string(&lease)?;
        let acquired = self
            .store
            .compare_and_set(&keys::lease(session_id), None, &value, Some(self.ttl))
            .await?;
        if acquired {
            self.leases.lock().await.insert(
                session_id.to_owned(),
                LeaseLocal { value, health: LeaseHealth::Owned(Instant::now()) },
            );
            tracing::info!(session_id, owner = %self.instance_id, "lease acquired");
        }
        Ok(acquired)
    }

    /// Local view: owned and renewed within TTL.
    pub async fn is_owned(&self, session_id: &str) -> bool {
        let leases = self.leases.lock().await;
        match leases.get(session_id) {
            Some(LeaseLocal { health: LeaseHealth::Owned(at), .. }) => at.elapsed() < self.ttl,
            _ => false,
        }
    }

    /// Local view: renewal is failing but the TTL has not yet elapsed.
    /// Callers must pause writes but may keep state resident.
    pub async fn is_uncertain(&self, session_id: &str) -> bool {
        let leases = self.leases.lock().await;
        match leases.get(session_id) {
            Some(LeaseLocal { health: LeaseHealth::Uncertain(since), .. }) => {
                since.elapsed() < self.ttl
            }
            _ => false,
        }
    }

    /// Re-read the lease from the store. True iff the stored value names
    /// this replica and the store has not expired it.
    pub async fn is_owned_strict(&self, session_id: &str) -> anyhow::Result<bool> {
        let Some(raw) = self.store.get(&keys::lease(session_id)).await? else {
            return Ok(false);
        };
        let lease: Lease = serde_json::from_str(&raw)?;
        Ok(lease.owner_id == self.instance_id)
    }

    /// Drop one lease: forget it locally and best-effort delete the key
    /// so another replica can take over without waiting for expiry.
    pub async fn release(&self, session_id: &str) {
        let held = self.leases.lock().await.remove(session_id).is_some();
        if held {
            if let Err(e) = self.store.del(&keys::lease(session_id)).await {
                tracing::warn!(session_id, err = %e, "failed to delete released lease");
            }
        }
    }

    /// Graceful shutdown: release every held lease and the heartbeat.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let held: Vec<String> = self.leases.lock().await.drain().map(|(id, _)| id).collect();
        for session_id in held {
            if let Err(e) = self.store.del(&keys::lease(&session_id)).await {
                tracing::warn!(session_id = %session_id, err = %e, "failed to release lease on stop");
            }
        }
        if let Err(e) = self.store.del(&keys::heartbeat(&self.instance_id)).await {
            tracing::debug!(err = %e, "failed to delete heartbeat on stop");
        }
        tracing::info!(owner = %self.instance_id, "lease coordinator stopped");
    }

    /// One renewal pass over every held lease, plus the heartbeat.
    /// Called on the renewal cadence; public so tests can drive it.
    pub async fn renew_now(&self) {
        let snapshot: Vec<(String, String)> = {
            let leases = self.leases.lock().await;
            leases.iter().map(|(id, l)| (id.clone(), l.value.clone())).collect()
        };

        for (session_id, old_value) in snapshot {
            let renewed = match serde_json::from_str::<Lease>(&old_value) {
                Ok(mut lease) => {
                    lease.renewed_at = epoch_ms();
                    lease
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, err = %e, "corrupt local lease value");
                    self.leases.lock().await.remove(&session_id);
                    continue;
                }
            };
            let new_value = match serde_json::to_string(&renewed) {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(session_id = %session_id, err = %e, "failed to encode lease");
                    continue;
                }
            };

            let outcome = self
                .store
                .compare_and_set(
                    &keys::lease(&session_id),
                    Some(&old_value),
                    &new_value,
                    Some(self.ttl),
                )
                .await;

            let mut leases = self.leases.lock().await;
            match outcome {
                Ok(true) => {
                    leases.insert(
                        session_id,
                        LeaseLocal { value: new_value, health: LeaseHealth::Owned(Instant::now()) },
                    );
                }
                Ok(false) => {
                    // The value changed under us: someone else took over.
                    // That is a definitive loss, not uncertainty.
                    leases.remove(&session_id);
                    tracing::warn!(session_id = %session_id, "lease lost to another owner");
                }
                Err(e) => {
                    if let Some(local) = leases.get_mut(&session_id) {
                        let since = match local.health {
                            LeaseHealth::Uncertain(since) => since,
                            LeaseHealth::Owned(_) => Instant::now(),
                        };
                        if since.elapsed() >= self.ttl {
                            leases.remove(&session_id);
                            tracing::warn!(
                                session_id = %session_id,
                                err = %e,
                                "lease expired while store was unreachable"
                            );
                        } else {
                            local.health = LeaseHealth::Uncertain(since);
                            tracing::warn!(
                                session_id = %session_id,
                                err = %e,
                                "lease renewal failed, entering uncertain state"
                            );
                        }
                    }
                }
            }
        }

        let heartbeat = Heartbeat {
            instance_id: self.instance_id.clone(),
            started_at: self.started_at,
            renewed_at: epoch_ms(),
        };
        match serde_json::to_string(&heartbeat) {
            Ok(value) => {
                if let Err(e) = self
                    .store
                    .set(&keys::heartbeat(&self.instance_id), &value, Some(self.ttl))
                    .await
                {
                    tracing::debug!(err = %e, "heartbeat refresh failed");
                }
            }
            Err(e) => tracing::error!(err = %e, "failed to encode heartbeat"),
        }
    }
}

#[cfg(test)]
#[path = "lease_tests.rs"]
mod tests;
