// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::LeaseCoordinator;
use crate::config::BridgeConfig;
use crate::model::Lease;
use crate::store::{keys, Store};

fn config(node: &str, ttl_secs: u64) -> BridgeConfig {
    BridgeConfig {
        node_name: Some(node.to_owned()),
        lease_ttl_secs: ttl_secs,
        lease_renew_secs: 1,
        ..BridgeConfig::default()
    }
}

fn coordinator(store: &Store, node: &str, ttl_secs: u64) -> Arc<LeaseCoordinator> {
    LeaseCoordinator::new(store.clone(), &config(node, ttl_secs), CancellationToken::new())
}

#[tokio::test]
async fn acquire_is_exclusive_between_replicas() {
    let store = Store::memory();
    let a = coordinator(&store, "replica-a", 15);
    let b = coordinator(&store, "replica-b", 15);

    assert!(a.try_acquire("s1").await.expect("acquire"));
    assert!(!b.try_acquire("s1").await.expect("acquire"));

    assert!(a.is_owned("s1").await);
    assert!(!b.is_owned("s1").await);
    assert!(a.is_owned_strict("s1").await.expect("strict"));
    assert!(!b.is_owned_strict("s1").await.expect("strict"));
}

#[tokio::test]
async fn renewal_keeps_ownership_and_rewrites_value() {
    let store = Store::memory();
    let a = coordinator(&store, "replica-a", 15);
    assert!(a.try_acquire("s1").await.expect("acquire"));

    let before: Lease = serde_json::from_str(
        &store.get(&keys::lease("s1")).await.expect("get").expect("present"),
    )
    .expect("lease json");

    tokio::time::sleep(Duration::from_millis(5)).await;
    a.renew_now().await;

    let after: Lease = serde_json::from_str(
        &store.get(&keys::lease("s1")).await.expect("get").expect("present"),
    )
    .expect("lease json");
    assert_eq!(after.owner_id, "replica-a");
    assert_eq!(after.acquired_at, before.acquired_at);
    assert!(after.renewed_at >= before.renewed_at);
    assert!(a.is_owned("s1").await);
}

#[tokio::test]
async fn cas_mismatch_means_immediate_loss() {
    let store = Store::memory();
    let a = coordinator(&store, "replica-a", 15);
    assert!(a.try_acquire("s1").await.expect("acquire"));

    // Another writer replaces the lease value out from under us.
    store
        .set(&keys::lease("s1"), "{\"stolen\":true}", None)
        .await
        .expect("set");
    a.renew_now().await;

    assert!(!a.is_owned("s1").await);
    assert!(!a.is_uncertain("s1").await);
}

#[tokio::test]
async fn expired_lease_can_be_taken_over() {
    let store = Store::memory();
    let a = coordinator(&store, "replica-a", 1);
    let b = coordinator(&store, "replica-b", 1);

    assert!(a.try_acquire("s1").await.expect("acquire"));
    assert!(!b.try_acquire("s1").await.expect("acquire"));

    // No renewal from A: the store expires the key.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(b.try_acquire("s1").await.expect("acquire"));
    assert!(b.is_owned_strict("s1").await.expect("strict"));
}

#[tokio::test]
async fn stop_releases_leases_for_immediate_takeover() {
    let store = Store::memory();
    let a = coordinator(&store, "replica-a", 15);
    let b = coordinator(&store, "replica-b", 15);

    assert!(a.try_acquire("s1").await.expect("acquire"));
    assert!(a.try_acquire("s2").await.expect("acquire"));
    a.stop().await;

    assert_eq!(store.get(&keys::lease("s1")).await.expect("get"), None);
    assert!(!a.is_owned("s1").await);
    // No TTL wait needed after a graceful stop.
    assert!(b.try_acquire("s1").await.expect("acquire"));
    assert!(b.try_acquire("s2").await.expect("acquire"));
}

#[tokio::test]
async fn release_frees_a_single_session() {
    let store = Store::memory();
    let a = coordinator(&store, "replica-a", 15);
    let b = coordinator(&store, "replica-b", 15);

    assert!(a.try_acquire("s1").await.expect("acquire"));
    assert!(a.try_acquire("s2").await.expect("acquire"));
    a.release("s1").await;

    assert!(!a.is_owned("s1").await);
    assert!(a.is_owned("s2").await);
    assert!(b.try_acquire("s1").await.expect("acquire"));
    assert!(!b.try_acquire("s2").await.expect("acquire"));
}

#[tokio::test]
async fn heartbeat_is_written_on_renewal() {
    let store = Store::memory();
    let a = coordinator(&store, "replica-a", 15);
    a.renew_now().await;
    let raw = store
        .get(&keys::heartbeat("replica-a"))
        .await
        .expect("get")
        .expect("heartbeat present");
    let hb: crate::model::Heartbeat = serde_json::from_str(&raw).expect("heartbeat json");
    assert_eq!(hb.instance_id, "replica-a");
}

#[tokio::test]
async fn default_instance_id_is_generated() {
    let store = Store::memory();
    let config = BridgeConfig::default();
    let a = LeaseCoordinator::new(store, &config, CancellationToken::new());
    assert!(!a.instance_id().is_empty());
}
