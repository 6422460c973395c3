// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::{update_session, Dispatch, Engine};
use crate::config::BridgeConfig;
use crate::lease::LeaseCoordinator;
use crate::model::{Event, EventType, Session};
use crate::store::{keys, Store};

async fn seed_session(store: &Store, id: &str) {
    let session = Session::new(id.to_owned(), "test".to_owned(), "http://up".to_owned());
    store
        .set(&keys::session(id), &serde_json::to_string(&session).expect("encode"), None)
        .await
        .expect("seed session");
}

async fn owned_engine_with_coordinator(
    store: &Store,
    id: &str,
    retention: i64,
) -> (Engine, Arc<LeaseCoordinator>) {
    let config = BridgeConfig {
        node_name: Some("replica-test".to_owned()),
        ..BridgeConfig::default()
    };
    let coordinator = LeaseCoordinator::new(store.clone(), &config, CancellationToken::new());
    assert!(coordinator.try_acquire(id).await.expect("acquire"));
    let engine = Engine::new(store.clone(), Arc::clone(&coordinator), id.to_owned(), retention);
    (engine, coordinator)
}

async fn owned_engine(store: &Store, id: &str, retention: i64) -> Engine {
    owned_engine_with_coordinator(store, id, retention).await.0
}

fn circuits_event(data: serde_json::Value) -> Event {
    Event::new(EventType::Circuits, data)
}

#[tokio::test]
async fn happy_path_writes_history_cache_and_publishes() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;
    let mut sub = store.subscribe(&keys::events_channel("s1")).await.expect("subscribe");

    let payload = json!([{"id": 1, "powerProduction": 100.0}]);
    let out = engine.dispatch("Alpha", 3600, circuits_event(payload.clone())).await;
    assert_eq!(out, Dispatch::Continue);

    // Frame arrives with the stamped game time.
    let frame = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("timely")
        .expect("frame");
    let event: serde_json::Value = serde_json::from_slice(&frame).expect("frame json");
    assert_eq!(event["type"], "circuits");
    assert_eq!(event["gameTimeId"], 3600);
    assert_eq!(event["data"], payload);

    // Once the frame is observed, cache and history are already written.
    let cached = store
        .get(&keys::state("s1", "Alpha", EventType::Circuits))
        .await
        .expect("get")
        .expect("cached");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&cached).expect("json"), payload);

    let members = store
        .zrange_by_score(&keys::history("s1", "Alpha", EventType::Circuits), i64::MIN, i64::MAX)
        .await
        .expect("zrange");
    assert_eq!(members, vec!["3600".to_owned()]);
    let blob = store
        .get(&keys::history_data("s1", "Alpha", EventType::Circuits, 3600))
        .await
        .expect("get")
        .expect("blob");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&blob).expect("json"), payload);
}

#[tokio::test]
async fn non_history_type_skips_the_index() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;

    let out = engine
        .dispatch("Alpha", 3600, Event::new(EventType::Players, json!([])))
        .await;
    assert_eq!(out, Dispatch::Continue);

    assert!(store
        .get(&keys::state("s1", "Alpha", EventType::Players))
        .await
        .expect("get")
        .is_some());
    let members = store
        .zrange_by_score(&keys::history("s1", "Alpha", EventType::Players), i64::MIN, i64::MAX)
        .await
        .expect("zrange");
    assert!(members.is_empty());
}

#[tokio::test]
async fn empty_save_suppresses_keyed_writes_but_publishes() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;
    let mut sub = store.subscribe(&keys::events_channel("s1")).await.expect("subscribe");

    let out = engine.dispatch("", 3600, circuits_event(json!([]))).await;
    assert_eq!(out, Dispatch::Continue);

    let frame = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("timely")
        .expect("frame");
    let event: serde_json::Value = serde_json::from_slice(&frame).expect("frame json");
    assert_eq!(event["type"], "circuits");

    assert!(store.scan_keys("state:*").await.expect("scan").is_empty());
    assert!(store.scan_keys("history:*").await.expect("scan").is_empty());
}

#[tokio::test]
async fn zero_game_time_suppresses_history() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;

    engine.dispatch("Alpha", 0, circuits_event(json!([]))).await;
    assert!(store.scan_keys("history:*").await.expect("scan").is_empty());
    // The latest cache is still written.
    assert!(store
        .get(&keys::state("s1", "Alpha", EventType::Circuits))
        .await
        .expect("get")
        .is_some());
}

#[tokio::test]
async fn rollback_reinsert_overwrites_without_duplicating() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;

    engine.dispatch("Alpha", 3005, circuits_event(json!([{"v": 1}]))).await;
    engine.dispatch("Alpha", 3005, circuits_event(json!([{"v": 2}]))).await;

    let members = store
        .zrange_by_score(&keys::history("s1", "Alpha", EventType::Circuits), i64::MIN, i64::MAX)
        .await
        .expect("zrange");
    assert_eq!(members.len(), 1);
    let blob = store
        .get(&keys::history_data("s1", "Alpha", EventType::Circuits, 3005))
        .await
        .expect("get")
        .expect("blob");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&blob).expect("json"), json!([{"v": 2}]));
}

#[tokio::test]
async fn pruning_drops_members_and_blobs_past_retention() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 50).await;

    engine.dispatch("Alpha", 100, circuits_event(json!([1]))).await;
    engine.dispatch("Alpha", 160, circuits_event(json!([2]))).await;

    let members = store
        .zrange_by_score(&keys::history("s1", "Alpha", EventType::Circuits), i64::MIN, i64::MAX)
        .await
        .expect("zrange");
    assert_eq!(members, vec!["160".to_owned()]);
    assert!(store
        .get(&keys::history_data("s1", "Alpha", EventType::Circuits, 100))
        .await
        .expect("get")
        .is_none());
}

#[tokio::test]
async fn retention_zero_disables_pruning() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;

    engine.dispatch("Alpha", 100, circuits_event(json!([1]))).await;
    engine.dispatch("Alpha", 100_000, circuits_event(json!([2]))).await;

    let members = store
        .zrange_by_score(&keys::history("s1", "Alpha", EventType::Circuits), i64::MIN, i64::MAX)
        .await
        .expect("zrange");
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn lost_lease_stops_without_writing() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let (engine, coordinator) = owned_engine_with_coordinator(&store, "s1", 0).await;

    // Steal the lease and let a renewal pass observe the mismatch.
    store
        .set(&keys::lease("s1"), "{\"stolen\":true}", None)
        .await
        .expect("set");
    coordinator.renew_now().await;

    let out = engine.dispatch("Alpha", 3600, circuits_event(json!([]))).await;
    assert_eq!(out, Dispatch::Stop);
    assert!(store.scan_keys("state:*").await.expect("scan").is_empty());
}

#[tokio::test]
async fn deleted_session_drops_event() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;
    store.del(&keys::session("s1")).await.expect("del");

    let out = engine.dispatch("Alpha", 3600, circuits_event(json!([]))).await;
    assert_eq!(out, Dispatch::Continue);
    assert!(store.scan_keys("state:*").await.expect("scan").is_empty());
}

#[tokio::test]
async fn api_status_updates_online_flag() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;

    engine
        .dispatch("Alpha", 0, Event::new(EventType::ApiStatus, json!({"isOnline": true})))
        .await;
    let session: Session = serde_json::from_str(
        &store.get(&keys::session("s1")).await.expect("get").expect("present"),
    )
    .expect("session json");
    assert!(session.is_online);
}

#[tokio::test]
async fn session_update_events_are_fanout_only() {
    let store = Store::memory();
    seed_session(&store, "s1").await;
    let engine = owned_engine(&store, "s1", 0).await;
    let mut sub = store.subscribe(&keys::events_channel("s1")).await.expect("subscribe");

    engine
        .dispatch("Alpha", 0, Event::new(EventType::SessionUpdate, json!({"id": "s1"})))
        .await;

    let frame = tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("timely")
        .expect("frame");
    let event: serde_json::Value = serde_json::from_slice(&frame).expect("frame json");
    assert_eq!(event["type"], "sessionUpdate");
    // Never cached, never indexed.
    assert!(store.scan_keys("state:*").await.expect("scan").is_empty());
    assert!(store.scan_keys("history:*").await.expect("scan").is_empty());
}

#[tokio::test]
async fn update_session_returns_none_for_missing() {
    let store = Store::memory();
    let updated = update_session(&store, "ghost", |s| s.is_online = true)
        .await
        .expect("update");
    assert!(updated.is_none());
}
