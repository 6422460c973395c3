// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end suites: a real publisher polling a mock upstream over
//! HTTP, with the in-memory store carrying cache, history, and fan-out.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use satbridge::config::BridgeConfig;
use satbridge::lease::LeaseCoordinator;
use satbridge::manager::SessionManager;
use satbridge::model::{EventType, Session};
use satbridge::store::{keys, Store};

struct MockUpstream {
    down: AtomicBool,
    save_name: RwLock<String>,
    total_play: AtomicI64,
}

impl MockUpstream {
    fn new(save_name: &str, total_play: i64) -> Arc<Self> {
        Arc::new(Self {
            down: AtomicBool::new(false),
            save_name: RwLock::new(save_name.to_owned()),
            total_play: AtomicI64::new(total_play),
        })
    }
}

async fn get_status(State(mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    if mock.down.load(Ordering::Relaxed) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(serde_json::json!({"IsGameRunning": true, "TechTier": 3})).into_response()
}

async fn get_circuits(State(mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    if mock.down.load(Ordering::Relaxed) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(serde_json::json!([
        {"CircuitID": 1, "PowerProduction": 100.0, "PowerConsumed": 60.0}
    ]))
    .into_response()
}

async fn get_session_info(State(mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    if mock.down.load(Ordering::Relaxed) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let save_name = mock.save_name.read().await.clone();
    Json(serde_json::json!({
        "SaveName": save_name,
        "TotalPlayDuration": mock.total_play.load(Ordering::Relaxed),
    }))
    .into_response()
}

/// Serve the mock on an ephemeral port and return its base URL.
async fn spawn_mock(mock: Arc<MockUpstream>) -> String {
    let router = Router::new()
        .route("/getStatus", get(get_status))
        .route("/getCircuits", get(get_circuits))
        .route("/getSessionInfo", get(get_session_info))
        .with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn fast_config(node: &str) -> Arc<BridgeConfig> {
    Arc::new(BridgeConfig {
        node_name: Some(node.to_owned()),
        cadence: vec![(EventType::Status, 50), (EventType::Circuits, 50)],
        session_info_ms: 50,
        light_poll_ms: 100,
        disconnect_threshold: 2,
        status_timeout_ms: 500,
        upstream_timeout_ms: 1000,
        ..BridgeConfig::default()
    })
}

async fn start_replica(
    store: &Store,
    config: Arc<BridgeConfig>,
) -> (Arc<SessionManager>, Arc<LeaseCoordinator>) {
    let coordinator = LeaseCoordinator::new(store.clone(), &config, CancellationToken::new());
    let manager = SessionManager::new(
        store.clone(),
        Arc::clone(&coordinator),
        config,
        CancellationToken::new(),
    );
    (manager, coordinator)
}

async fn seed_session(store: &Store, id: &str, address: &str) {
    let session = Session::new(id.to_owned(), id.to_owned(), address.to_owned());
    store
        .set(&keys::session(id), &serde_json::to_string(&session).expect("encode"), None)
        .await
        .expect("seed");
}

async fn load_session(store: &Store, id: &str) -> Session {
    let raw = store
        .get(&keys::session(id))
        .await
        .expect("get")
        .expect("session present");
    serde_json::from_str(&raw).expect("session json")
}

async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if condition().await {
            return;
        }
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn happy_path_caches_indexes_and_fans_out() {
    let mock = MockUpstream::new("Alpha", 3600);
    let url = spawn_mock(Arc::clone(&mock)).await;
    let store = Store::memory();
    seed_session(&store, "s1", &url).await;

    let (manager, _) = start_replica(&store, fast_config("replica-a")).await;
    let mut sub = store.subscribe(&keys::events_channel("s1")).await.expect("subscribe");
    manager.reconcile().await;

    // Latest cache lands under the probed save name.
    let state_key = keys::state("s1", "Alpha", EventType::Circuits);
    wait_until("circuits cache", || {
        let store = store.clone();
        let key = state_key.clone();
        async move { store.get(&key).await.expect("get").is_some() }
    })
    .await;

    // History is indexed by game time.
    let members = store
        .zrange_by_score(&keys::history("s1", "Alpha", EventType::Circuits), i64::MIN, i64::MAX)
        .await
        .expect("zrange");
    assert!(!members.is_empty());
    let first: i64 = members[0].parse().expect("member is a game time");
    assert!(first >= 3600);

    // A subscriber sees the circuits frame with its game-time stamp.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        assert!(Instant::now() < deadline, "no circuits frame");
        let Ok(Some(frame)) =
            tokio::time::timeout(Duration::from_secs(1), sub.recv()).await
        else {
            continue;
        };
        let event: serde_json::Value = serde_json::from_slice(&frame).expect("frame json");
        if event["type"] == "circuits" && event["gameTimeId"].is_i64() {
            assert_eq!(event["data"][0]["powerProduction"], 100.0);
            break;
        }
    }

    // The session record reflects the probe results.
    wait_until("session online", || {
        let store = store.clone();
        async move {
            let session = load_session(&store, "s1").await;
            session.is_online && session.save_name == "Alpha"
        }
    })
    .await;

    manager.stop().await;
}

#[tokio::test]
async fn disconnect_enters_light_polling_and_recovers() {
    let mock = MockUpstream::new("Alpha", 3600);
    let url = spawn_mock(Arc::clone(&mock)).await;
    let store = Store::memory();
    seed_session(&store, "s1", &url).await;

    let (manager, _) = start_replica(&store, fast_config("replica-a")).await;
    manager.reconcile().await;

    wait_until("session online", || {
        let store = store.clone();
        async move { load_session(&store, "s1").await.is_online }
    })
    .await;

    // Kill the upstream: consecutive status failures flip the session to
    // disconnected light polling.
    mock.down.store(true, Ordering::Relaxed);
    wait_until("disconnect flag", || {
        let store = store.clone();
        async move {
            let session = load_session(&store, "s1").await;
            session.is_disconnected && !session.is_online
        }
    })
    .await;

    // Bring it back: one good status poll restores full cadence.
    mock.down.store(false, Ordering::Relaxed);
    wait_until("reconnect", || {
        let store = store.clone();
        async move {
            let session = load_session(&store, "s1").await;
            !session.is_disconnected && session.is_online
        }
    })
    .await;

    manager.stop().await;
}

#[tokio::test]
async fn save_switch_starts_a_new_keyspace_and_emits_session_update() {
    let mock = MockUpstream::new("Alpha", 3600);
    let url = spawn_mock(Arc::clone(&mock)).await;
    let store = Store::memory();
    seed_session(&store, "s1", &url).await;

    let (manager, _) = start_replica(&store, fast_config("replica-a")).await;
    let mut sub = store.subscribe(&keys::events_channel("s1")).await.expect("subscribe");
    manager.reconcile().await;

    let alpha_key = keys::state("s1", "Alpha", EventType::Circuits);
    wait_until("alpha cache", || {
        let store = store.clone();
        let key = alpha_key.clone();
        async move { store.get(&key).await.expect("get").is_some() }
    })
    .await;

    // Load a different save upstream.
    *mock.save_name.write().await = "Beta".to_owned();

    let beta_key = keys::state("s1", "Beta", EventType::Circuits);
    wait_until("beta cache", || {
        let store = store.clone();
        let key = beta_key.clone();
        async move { store.get(&key).await.expect("get").is_some() }
    })
    .await;

    // The old keyspace is left intact.
    assert!(store.get(&alpha_key).await.expect("get").is_some());

    // One sessionUpdate frame announces the switch.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        assert!(Instant::now() < deadline, "no sessionUpdate frame");
        let Ok(Some(frame)) =
            tokio::time::timeout(Duration::from_secs(1), sub.recv()).await
        else {
            continue;
        };
        let event: serde_json::Value = serde_json::from_slice(&frame).expect("frame json");
        if event["type"] == "sessionUpdate" {
            assert_eq!(event["data"]["saveName"], "Beta");
            break;
        }
    }

    manager.stop().await;
}
