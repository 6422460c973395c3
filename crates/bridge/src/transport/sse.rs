// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSE fan-out: one stream per subscriber, relaying the session's
//! pub/sub channel. No replay — clients resync from the latest-state
//! snapshot on reconnect.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, KeepAliveStream, Sse};
use axum::response::IntoResponse;
use futures_util::stream::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use crate::error::ApiError;
use crate::store::{keys, SUBSCRIBER_BUFFER};

use super::http::load_session;
use super::AppState;

/// SSE event name carried on every frame.
const EVENT_NAME: &str = "satisfactory_event";

/// How often the forwarder re-checks that the session still exists, so a
/// delete closes the stream cleanly.
const EXISTENCE_PROBE: Duration = Duration::from_secs(5);

/// `GET /v1/sessions/{id}/events`
pub async fn session_events(
    State(s): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    load_session(&s.store, &id).await?;

    let mut subscription = s
        .store
        .subscribe(&keys::events_channel(&id))
        .await
        .map_err(ApiError::from)?;

    let (tx, rx) = mpsc::channel::<SseEvent>(SUBSCRIBER_BUFFER);
    let store = s.store.clone();
    let session_key = keys::session(&id);

    tokio::spawn(async move {
        let mut probe = tokio::time::interval(EXISTENCE_PROBE);
        probe.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Swallow the immediate first tick.
        probe.tick().await;

        loop {
            tokio::select! {
                msg = subscription.recv() => {
                    let Some(payload) = msg else { break };
                    let data = String::from_utf8_lossy(&payload).into_owned();
                    let frame = SseEvent::default().event(EVENT_NAME).data(data);
                    // A subscriber that cannot keep up is closed; it will
                    // reconnect and resync from the snapshot.
                    if tx.try_send(frame).is_err() {
                        break;
                    }
                }
                _ = probe.tick() => {
                    if tx.is_closed() {
                        break;
                    }
                    match store.exists(&session_key).await {
                        Ok(true) => {}
                        Ok(false) => {
                            tracing::debug!(key = %session_key, "session deleted, closing stream");
                            break;
                        }
                        Err(e) => {
                            tracing::debug!(key = %session_key, err = %e, "existence probe failed");
                        }
                    }
                }
            }
        }
    });

    let stream: ReceiverStream<SseEvent> = ReceiverStream::new(rx);
    let stream = stream.map(Ok::<_, Infallible>);
    Ok(sse_response(stream))
}

fn sse_response<S>(stream: S) -> Sse<KeepAliveStream<S>>
where
    S: Stream<Item = Result<SseEvent, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
