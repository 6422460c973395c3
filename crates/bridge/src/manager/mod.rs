// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager: discovers sessions, owns publisher lifecycle, and
//! reconciles the running set against the store and the lease state.

pub mod publisher;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::gametime::GameTimeTracker;
use crate::lease::LeaseCoordinator;
use crate::model::Session;
use crate::store::{keys, Store};

/// Per-session publisher state: cancel handle, connection flag, save-name
/// cell, and the game-time tracker. Shared with the publisher task and
/// the info monitor.
pub struct PublisherHandle {
    pub session_id: String,
    /// Address the publisher was started with; a mismatch against the
    /// stored session forces a restart.
    pub address: String,
    pub cancel: CancellationToken,
    pub tracker: Mutex<GameTimeTracker>,
    pub save_name: RwLock<String>,
    pub disconnected: AtomicBool,
}

pub struct SessionManager {
    store: Store,
    coordinator: Arc<LeaseCoordinator>,
    config: Arc<BridgeConfig>,
    publishers: RwLock<HashMap<String, Arc<PublisherHandle>>>,
    shutdown: CancellationToken,
}

impl SessionManager {
    pub fn new(
        store: Store,
        coordinator: Arc<LeaseCoordinator>,
        config: Arc<BridgeConfig>,
        shutdown: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            coordinator,
            config,
            publishers: RwLock::new(HashMap::new()),
            shutdown,
        })
    }

    /// Spawn the periodic reconciler.
    pub fn spawn_reconciler(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(manager.config.reconcile_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = manager.shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                manager.reconcile().await;
            }
        });
    }

    /// One reconciliation pass: stop publishers for sessions that were
    /// paused, deleted, re-addressed, or whose lease is definitively
    /// lost; then try to acquire every unowned non-paused session.
    pub async fn reconcile(&self) {
        let sessions = match self.load_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::warn!(err = %e, "failed to load session list");
                return;
            }
        };
        let by_id: HashMap<&str, &Session> =
            sessions.iter().map(|s| (s.id.as_str(), s)).collect();

        let running: Vec<(String, Arc<PublisherHandle>)> = {
            let publishers = self.publishers.read().await;
            publishers.iter().map(|(id, h)| (id.clone(), Arc::clone(h))).collect()
        };

        for (id, handle) in &running {
            let verdict = match by_id.get(id.as_str()) {
                None => Some(("deleted", true)),
                Some(s) if s.is_paused => Some(("paused", true)),
                Some(s) if s.address != handle.address => Some(("address changed", true)),
                Some(_) => {
                    if !self.coordinator.is_owned(id).await
                        && !self.coordinator.is_uncertain(id).await
                    {
                        // The coordinator already dropped its bookkeeping.
                        Some(("lease lost", false))
                    } else {
                        None
                    }
                }
            };
            if let Some((reason, release)) = verdict {
                tracing::info!(session_id = %id, reason, "stopping publisher");
                handle.cancel.cancel();
                self.publishers.write().await.remove(id);
                if release {
                    self.coordinator.release(id).await;
                }
            }
        }

        for session in sessions {
            if session.is_paused {
                continue;
            }
            if self.publishers.read().await.contains_key(&session.id) {
                continue;
            }
            match self.coordinator.try_acquire(&session.id).await {
                Ok(true) => self.start_publisher(session).await,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(session_id = %session.id, err = %e, "lease acquire failed");
                }
            }
        }
    }

    async fn load_sessions(&self) -> anyhow::Result<Vec<Session>> {
        let mut sessions = Vec::new();
        for key in self.store.scan_keys(keys::SESSION_PATTERN).await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Session>(&raw) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!(key = %key, err = %e, "skipping corrupt session record"),
            }
        }
        Ok(sessions)
    }

    async fn start_publisher(&self, session: Session) {
        let handle = Arc::new(PublisherHandle {
            session_id: session.id.clone(),
            address: session.address.clone(),
            cancel: self.shutdown.child_token(),
            tracker: Mutex::new(GameTimeTracker::new(self.config.rollback_tolerance_secs)),
            save_name: RwLock::new(session.save_name.clone()),
            disconnected: AtomicBool::new(session.is_disconnected),
        });
        self.publishers
            .write()
            .await
            .insert(session.id.clone(), Arc::clone(&handle));
        publisher::spawn(publisher::PublisherCtx {
            store: self.store.clone(),
            coordinator: Arc::clone(&self.coordinator),
            config: Arc::clone(&self.config),
            session,
            handle,
        });
    }

    /// Session ids with a running publisher.
    pub async fn running(&self) -> Vec<String> {
        let publishers = self.publishers.read().await;
        let mut ids: Vec<String> = publishers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Graceful shutdown: stop every publisher and release all leases so
    /// other replicas take over without waiting for expiry.
    pub async fn stop(&self) {
        let drained: Vec<Arc<PublisherHandle>> = {
            let mut publishers = self.publishers.write().await;
            publishers.drain().map(|(_, h)| h).collect()
        };
        for handle in &drained {
            handle.cancel.cancel();
        }
        self.coordinator.stop().await;
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
