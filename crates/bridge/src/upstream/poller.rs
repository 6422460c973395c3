// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadenced pollers for one session.
//!
//! Connected mode runs one ticker task per schedule entry; light mode
//! runs only the status ticker at a slow cadence. Endpoint failures are
//! logged and retried by the next tick — only cancellation stops a loop.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::BridgeConfig;
use crate::model::{Event, EventType};
use crate::normalize::normalize;
use crate::upstream::queue::RequestQueue;
use crate::upstream::schedule::{ScheduleEntry, SCHEDULE, STATUS_ENDPOINT};

/// Messages delivered to the publisher mailbox.
#[derive(Debug)]
pub enum PollerMsg {
    Event(Event),
    /// Status polls failed for the configured window; switch to light
    /// polling.
    Disconnected,
    /// A status poll succeeded while in light mode; resume full cadence.
    Recovered,
}

#[derive(Clone)]
pub struct PollerCtx {
    pub session_id: String,
    pub queue: RequestQueue,
    pub config: Arc<BridgeConfig>,
    pub events: mpsc::Sender<PollerMsg>,
}

/// Start the full cadenced poller set. Returns once every ticker task is
/// running.
pub fn spawn_event_stream(ctx: &PollerCtx, cancel: CancellationToken) {
    for entry in &SCHEDULE {
        let ctx = ctx.clone();
        let cancel = cancel.clone();
        tokio::spawn(run_entry(ctx, entry, cancel));
    }
}

/// Start light polling: only the status endpoint, at the slow cadence.
pub fn spawn_light_polling(ctx: &PollerCtx, cancel: CancellationToken) {
    let ctx = ctx.clone();
    tokio::spawn(run_light(ctx, cancel));
}

async fn run_entry(ctx: PollerCtx, entry: &'static ScheduleEntry, cancel: CancellationToken) {
    let period = ctx.config.cadence_for(entry.event_type);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut status_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(parts) = fetch_group(&ctx, entry).await else {
            // Coalesced: the previous fetch for this group is still in
            // flight.
            continue;
        };

        if entry.event_type == EventType::Status {
            match &parts {
                Ok(_) => {
                    status_failures = 0;
                    if !emit_api_status(&ctx, true).await {
                        break;
                    }
                }
                Err(_) => {
                    status_failures += 1;
                    if !emit_api_status(&ctx, false).await {
                        break;
                    }
                    if status_failures == ctx.config.disconnect_threshold
                        && ctx.events.send(PollerMsg::Disconnected).await.is_err()
                    {
                        break;
                    }
                }
            }
        }

        let parts = match parts {
            Ok(parts) => parts,
            Err(e) => {
                tracing::debug!(
                    session_id = %ctx.session_id,
                    event_type = %entry.event_type,
                    err = %e,
                    "endpoint poll failed"
                );
                continue;
            }
        };

        match normalize(entry.event_type, &parts) {
            Ok(data) => {
                let event = Event::new(entry.event_type, data);
                if ctx.events.send(PollerMsg::Event(event)).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %ctx.session_id,
                    event_type = %entry.event_type,
                    err = %e,
                    "normalization failed, dropping event"
                );
            }
        }
    }
}

async fn run_light(ctx: PollerCtx, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(ctx.config.light_poll_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let Some(rx) = ctx.queue.request(STATUS_ENDPOINT, ctx.config.status_timeout()).await else {
            continue;
        };
        let result = match rx.await {
            Ok(result) => result,
            Err(_) => continue,
        };

        match result {
            Ok(body) => {
                if !emit_api_status(&ctx, true).await {
                    break;
                }
                if let Ok(data) = normalize(EventType::Status, &[body]) {
                    let event = Event::new(EventType::Status, data);
                    if ctx.events.send(PollerMsg::Event(event)).await.is_err() {
                        break;
                    }
                }
                if ctx.events.send(PollerMsg::Recovered).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(
                    session_id = %ctx.session_id,
                    err = %e,
                    "status poll failed while disconnected"
                );
                if !emit_api_status(&ctx, false).await {
                    break;
                }
            }
        }
    }
}

/// Enqueue every endpoint of a group and await the parts. `None` when any
/// part was coalesced; `Some(Err)` when any fetch failed.
async fn fetch_group(
    ctx: &PollerCtx,
    entry: &ScheduleEntry,
) -> Option<anyhow::Result<Vec<serde_json::Value>>> {
    let timeout = if entry.event_type == EventType::Status {
        ctx.config.status_timeout()
    } else {
        ctx.config.upstream_timeout()
    };

    let mut receivers = Vec::with_capacity(entry.endpoints.len());
    for path in entry.endpoints {
        match ctx.queue.request(path, timeout).await {
            Some(rx) => receivers.push(rx),
            None => return None,
        }
    }

    let mut parts = Vec::with_capacity(receivers.len());
    for rx in receivers {
        match rx.await {
            Ok(Ok(value)) => parts.push(value),
            Ok(Err(e)) => return Some(Err(e)),
            Err(_) => return Some(Err(anyhow::anyhow!("fetch worker dropped"))),
        }
    }
    Some(Ok(parts))
}

async fn emit_api_status(ctx: &PollerCtx, is_online: bool) -> bool {
    let event = Event::new(EventType::ApiStatus, json!({ "isOnline": is_online }));
    ctx.events.send(PollerMsg::Event(event)).await.is_ok()
}
