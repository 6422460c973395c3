// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-replica failover scenarios: two coordinators and managers on
//! one shared store.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use satbridge::config::BridgeConfig;
use satbridge::lease::LeaseCoordinator;
use satbridge::manager::SessionManager;
use satbridge::model::Session;
use satbridge::store::{keys, Store};

fn replica(
    store: &Store,
    node: &str,
    ttl_secs: u64,
) -> (Arc<SessionManager>, Arc<LeaseCoordinator>) {
    let config = Arc::new(BridgeConfig {
        node_name: Some(node.to_owned()),
        lease_ttl_secs: ttl_secs,
        lease_renew_secs: 1,
        ..BridgeConfig::default()
    });
    let coordinator = LeaseCoordinator::new(store.clone(), &config, CancellationToken::new());
    let manager = SessionManager::new(
        store.clone(),
        Arc::clone(&coordinator),
        config,
        CancellationToken::new(),
    );
    (manager, coordinator)
}

async fn seed_session(store: &Store, id: &str) {
    let session = Session::new(id.to_owned(), id.to_owned(), "http://127.0.0.1:1".to_owned());
    store
        .set(&keys::session(id), &serde_json::to_string(&session).expect("encode"), None)
        .await
        .expect("seed");
}

/// At most one replica holds a valid lease for any session.
async fn assert_single_owner(
    session_id: &str,
    replicas: &[&Arc<LeaseCoordinator>],
) {
    let mut owners = 0;
    for coordinator in replicas {
        if coordinator.is_owned_strict(session_id).await.expect("strict") {
            owners += 1;
        }
    }
    assert!(owners <= 1, "{owners} owners for {session_id}");
}

#[tokio::test]
async fn crashed_replica_is_taken_over_within_one_ttl() {
    let store = Store::memory();
    seed_session(&store, "s1").await;

    let (a, coord_a) = replica(&store, "replica-a", 1);
    let (b, coord_b) = replica(&store, "replica-b", 1);

    a.reconcile().await;
    assert_eq!(a.running().await, vec!["s1".to_owned()]);

    b.reconcile().await;
    assert!(b.running().await.is_empty());
    assert_single_owner("s1", &[&coord_a, &coord_b]).await;

    // Crash A: no renewal, no release. The store expires the lease.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    b.reconcile().await;
    assert_eq!(b.running().await, vec!["s1".to_owned()]);
    assert!(coord_b.is_owned_strict("s1").await.expect("strict"));
}

#[tokio::test]
async fn renewed_lease_is_not_taken_over() {
    let store = Store::memory();
    seed_session(&store, "s1").await;

    let (a, coord_a) = replica(&store, "replica-a", 1);
    let (b, _) = replica(&store, "replica-b", 1);

    a.reconcile().await;
    // A stays alive: renewals land inside the TTL window.
    for _ in 0..4 {
        tokio::time::sleep(Duration::from_millis(400)).await;
        coord_a.renew_now().await;
        b.reconcile().await;
        assert!(b.running().await.is_empty());
    }
    assert_eq!(a.running().await, vec!["s1".to_owned()]);
}

#[tokio::test]
async fn graceful_drain_hands_over_without_ttl_wait() {
    let store = Store::memory();
    for id in ["s1", "s2", "s3"] {
        seed_session(&store, id).await;
    }

    let (a, _) = replica(&store, "replica-a", 15);
    let (b, coord_b) = replica(&store, "replica-b", 15);

    a.reconcile().await;
    assert_eq!(a.running().await.len(), 3);

    // Clean shutdown releases every lease; no TTL wait for the peer.
    a.stop().await;
    b.reconcile().await;
    assert_eq!(b.running().await.len(), 3);
    for id in ["s1", "s2", "s3"] {
        assert!(coord_b.is_owned_strict(id).await.expect("strict"), "{id}");
    }
}

#[tokio::test]
async fn sessions_spread_across_contending_replicas_stay_disjoint() {
    let store = Store::memory();
    for id in ["s1", "s2", "s3", "s4"] {
        seed_session(&store, id).await;
    }

    let (a, coord_a) = replica(&store, "replica-a", 15);
    let (b, coord_b) = replica(&store, "replica-b", 15);

    // Interleave acquisition passes.
    a.reconcile().await;
    b.reconcile().await;
    a.reconcile().await;
    b.reconcile().await;

    let mut all: Vec<String> = a.running().await;
    all.extend(b.running().await);
    all.sort();
    assert_eq!(all, vec!["s1", "s2", "s3", "s4"]);
    for id in ["s1", "s2", "s3", "s4"] {
        assert_single_owner(id, &[&coord_a, &coord_b]).await;
    }
}
