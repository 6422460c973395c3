// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Satbridge: multi-tenant polling and fan-out gateway bridging
//! Satisfactory game servers to dashboard clients.
//!
//! Replicas coordinate through the shared store so exactly one replica
//! polls any given session; ownership migrates within the lease TTL when
//! a replica dies, and immediately on a clean shutdown.

pub mod config;
pub mod engine;
pub mod error;
pub mod gametime;
pub mod lease;
pub mod manager;
pub mod model;
pub mod normalize;
pub mod store;
pub mod transport;
pub mod upstream;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::lease::LeaseCoordinator;
use crate::manager::SessionManager;
use crate::store::Store;
use crate::transport::{build_router, AppState};

/// Run the bridge until shutdown.
pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let store = Store::connect_redis(&config.store_address, config.store_timeout()).await?;
    let config = Arc::new(config);

    let coordinator = LeaseCoordinator::new(store.clone(), &config, shutdown.clone());
    coordinator.spawn_renewal();

    let manager = SessionManager::new(
        store.clone(),
        Arc::clone(&coordinator),
        Arc::clone(&config),
        shutdown.clone(),
    );
    manager.spawn_reconciler();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    let state = Arc::new(AppState { store, config: Arc::clone(&config) });
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(instance = %coordinator.instance_id(), "satbridge listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    // Release every lease before exiting so peers take over sub-second.
    manager.stop().await;
    Ok(())
}
