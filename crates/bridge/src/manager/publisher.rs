// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publisher task for one owned session.
//!
//! Drives the cadenced pollers through the connection-state machine and
//! funnels every event through the engine. The game-time tracker and
//! save name survive mode changes so history continuity is retained when
//! the upstream reconnects.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::BridgeConfig;
use crate::engine::{update_session, Dispatch, Engine};
use crate::lease::LeaseCoordinator;
use crate::model::{Event, EventType, Session};
use crate::store::Store;
use crate::upstream::client::UpstreamClient;
use crate::upstream::poller::{spawn_event_stream, spawn_light_polling, PollerCtx, PollerMsg};
use crate::upstream::queue::RequestQueue;

use super::PublisherHandle;

/// Mailbox depth for events flowing from the pollers to the engine.
const MAILBOX: usize = 64;

pub struct PublisherCtx {
    pub store: Store,
    pub coordinator: Arc<LeaseCoordinator>,
    pub config: Arc<BridgeConfig>,
    pub session: Session,
    pub handle: Arc<PublisherHandle>,
}

pub fn spawn(ctx: PublisherCtx) {
    tokio::spawn(run(ctx));
}

enum Next {
    Stop,
    GoLight,
    GoFull,
}

async fn run(ctx: PublisherCtx) {
    let PublisherCtx { store, coordinator, config, session, handle } = ctx;
    let session_id = session.id.clone();

    let client = Arc::new(UpstreamClient::new(session.address.clone()));
    let queue = RequestQueue::new(Arc::clone(&client), handle.cancel.clone());
    let engine = Engine::new(
        store.clone(),
        Arc::clone(&coordinator),
        session_id.clone(),
        config.max_sample_game_duration,
    );
    let (events_tx, mut events_rx) = mpsc::channel(MAILBOX);

    spawn_info_monitor(
        store.clone(),
        Arc::clone(&config),
        Arc::clone(&client),
        Arc::clone(&handle),
        events_tx.clone(),
    );

    tracing::info!(session_id = %session_id, "publisher started");

    loop {
        let light = handle.disconnected.load(Ordering::Relaxed);
        let poll_cancel = handle.cancel.child_token();
        let poller_ctx = PollerCtx {
            session_id: session_id.clone(),
            queue: queue.clone(),
            config: Arc::clone(&config),
            events: events_tx.clone(),
        };
        if light {
            spawn_light_polling(&poller_ctx, poll_cancel.clone());
        } else {
            spawn_event_stream(&poller_ctx, poll_cancel.clone());
        }

        let next = consume(&handle, &engine, &mut events_rx, light).await;
        poll_cancel.cancel();

        match next {
            Next::Stop => break,
            Next::GoLight => {
                handle.disconnected.store(true, Ordering::Relaxed);
                if let Err(e) =
                    update_session(&store, &session_id, |s| s.is_disconnected = true).await
                {
                    tracing::warn!(session_id = %session_id, err = %e, "failed to persist disconnect");
                }
                tracing::warn!(session_id = %session_id, "upstream disconnected, entering light polling");
            }
            Next::GoFull => {
                handle.disconnected.store(false, Ordering::Relaxed);
                if let Err(e) =
                    update_session(&store, &session_id, |s| s.is_disconnected = false).await
                {
                    tracing::warn!(session_id = %session_id, err = %e, "failed to persist reconnect");
                }
                tracing::info!(session_id = %session_id, "upstream recovered, resuming full cadence");
            }
        }
    }

    tracing::info!(session_id = %session_id, "publisher stopped");
}

/// Drain the mailbox until cancellation, a lease loss, or a connection
/// mode change.
async fn consume(
    handle: &PublisherHandle,
    engine: &Engine,
    events: &mut mpsc::Receiver<PollerMsg>,
    light: bool,
) -> Next {
    loop {
        let msg = tokio::select! {
            _ = handle.cancel.cancelled() => return Next::Stop,
            msg = events.recv() => match msg {
                Some(msg) => msg,
                None => return Next::Stop,
            },
        };
        match msg {
            PollerMsg::Event(event) => {
                let save_name = handle.save_name.read().await.clone();
                let game_time = handle.tracker.lock().await.current();
                if engine.dispatch(&save_name, game_time, event).await == Dispatch::Stop {
                    return Next::Stop;
                }
            }
            PollerMsg::Disconnected if !light => return Next::GoLight,
            PollerMsg::Recovered if light => return Next::GoFull,
            // Stale transition messages from a poller set that was just
            // cancelled.
            PollerMsg::Disconnected | PollerMsg::Recovered => {}
        }
    }
}

/// Slow-cadence session-info probe: feeds the game-time tracker and
/// persists save-name changes, emitting one `sessionUpdate` per change.
fn spawn_info_monitor(
    store: Store,
    config: Arc<BridgeConfig>,
    client: Arc<UpstreamClient>,
    handle: Arc<PublisherHandle>,
    events: mpsc::Sender<PollerMsg>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.session_info_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = handle.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let info = match client.session_info(config.upstream_timeout()).await {
                Ok(info) => info,
                Err(e) => {
                    tracing::debug!(session_id = %handle.session_id, err = %e, "session info probe failed");
                    continue;
                }
            };

            let rollback = handle.tracker.lock().await.update(info.total_play_duration);
            if let Some(rb) = rollback {
                tracing::warn!(
                    session_id = %handle.session_id,
                    expected = rb.expected,
                    reported = rb.reported,
                    delta = rb.delta,
                    "game time rollback detected"
                );
            }

            let prev = handle.save_name.read().await.clone();
            if info.save_name.is_empty() || info.save_name == prev {
                continue;
            }
            *handle.save_name.write().await = info.save_name.clone();
            // The previous save's cache and history stay untouched; the
            // new save simply begins a new keyspace.
            let save_name = info.save_name.clone();
            match update_session(&store, &handle.session_id, |s| s.save_name = save_name).await {
                Ok(Some(updated)) => {
                    tracing::info!(
                        session_id = %handle.session_id,
                        save = %info.save_name,
                        "save name changed"
                    );
                    match serde_json::to_value(&updated) {
                        Ok(data) => {
                            let event = Event::new(EventType::SessionUpdate, data);
                            if events.send(PollerMsg::Event(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(session_id = %handle.session_id, err = %e, "failed to encode session");
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(session_id = %handle.session_id, err = %e, "failed to persist save name");
                }
            }
        }
    });
}
