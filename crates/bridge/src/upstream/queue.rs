// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serial request queue for one upstream.
//!
//! All upstream calls for a session pass through here: at most one
//! pending request per endpoint path (a cadence tick whose endpoint is
//! already queued or in flight is coalesced away), overall concurrency
//! bounded so a burst of tickers cannot overload the upstream.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::upstream::client::UpstreamClient;

/// Overall in-flight bound per upstream.
const MAX_IN_FLIGHT: usize = 4;

/// Queue depth; enough for every endpoint group to have one pending job.
const QUEUE_CAPACITY: usize = 32;

struct FetchJob {
    path: String,
    timeout: Duration,
    reply: oneshot::Sender<anyhow::Result<serde_json::Value>>,
}

#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::Sender<FetchJob>,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl RequestQueue {
    pub fn new(client: Arc<UpstreamClient>, cancel: CancellationToken) -> Self {
        let (tx, mut rx) = mpsc::channel::<FetchJob>(QUEUE_CAPACITY);
        let pending = Arc::new(Mutex::new(HashSet::new()));
        let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));

        {
            let pending = Arc::clone(&pending);
            tokio::spawn(async move {
                loop {
                    let job = tokio::select! {
                        _ = cancel.cancelled() => break,
                        job = rx.recv() => match job {
                            Some(job) => job,
                            None => break,
                        },
                    };
                    let permit = tokio::select! {
                        _ = cancel.cancelled() => break,
                        permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break,
                        },
                    };
                    let client = Arc::clone(&client);
                    let pending = Arc::clone(&pending);
                    tokio::spawn(async move {
                        let result = client.get_json(&job.path, job.timeout).await;
                        pending.lock().await.remove(&job.path);
                        let _ = job.reply.send(result);
                        drop(permit);
                    });
                }
            });
        }

        Self { tx, pending }
    }

    /// Enqueue a fetch. Returns `None` when coalesced — an equivalent
    /// request is already queued or in flight, or the queue is full.
    pub async fn request(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Option<oneshot::Receiver<anyhow::Result<serde_json::Value>>> {
        {
            let mut pending = self.pending.lock().await;
            if !pending.insert(path.to_owned()) {
                return None;
            }
        }
        let (reply, rx) = oneshot::channel();
        let job = FetchJob { path: path.to_owned(), timeout, reply };
        match self.tx.try_send(job) {
            Ok(()) => Some(rx),
            Err(_) => {
                self.pending.lock().await.remove(path);
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
