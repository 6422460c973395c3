// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store backend. Same semantics as the Redis backend: lazy TTL
//! expiry, inclusive sorted-set ranges, subscribe-after-publish loses the
//! message.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{Subscription, SUBSCRIBER_BUFFER};

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    kv: HashMap<String, ValueEntry>,
    zsets: HashMap<String, HashMap<String, i64>>,
    channels: HashMap<String, broadcast::Sender<Vec<u8>>>,
}

struct ValueEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl ValueEntry {
    fn live(&self) -> bool {
        self.expires_at.is_none_or(|at| at > Instant::now())
    }
}

impl Inner {
    /// Drop the entry if expired, then return the live value.
    fn live_value(&mut self, key: &str) -> Option<&str> {
        if self.kv.get(key).is_some_and(|e| !e.live()) {
            self.kv.remove(key);
        }
        self.kv.get(key).map(|e| e.value.as_str())
    }

    fn channel(&mut self, name: &str) -> broadcast::Sender<Vec<u8>> {
        self.channels
            .entry(name.to_owned())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_BUFFER).0)
            .clone()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner::default())) }
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.live_value(key).map(str::to_owned))
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.kv.insert(
            key.to_owned(),
            ValueEntry { value: value.to_owned(), expires_at: ttl.map(|t| Instant::now() + t) },
        );
        Ok(())
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner.kv.remove(key);
        inner.zsets.remove(key);
        Ok(())
    }

    pub async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner.live_value(key).is_some() || inner.zsets.contains_key(key))
    }

    pub async fn scan_keys(&self, pattern: &str) -> anyhow::Result<Vec<String>> {
        let mut inner = self.inner.lock().await;
        let expired: Vec<String> = inner
            .kv
            .iter()
            .filter(|(_, e)| !e.live())
            .map(|(k, _)| k.clone())
            .collect();
        for k in expired {
            inner.kv.remove(&k);
        }
        let mut found: Vec<String> = inner
            .kv
            .keys()
            .chain(inner.zsets.keys())
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect();
        found.sort();
        found.dedup();
        Ok(found)
    }

    pub async fn compare_and_set(
        &self,
        key: &str,
        expect: Option<&str>,
        new: &str,
        ttl: Option<Duration>,
    ) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().await;
        let current = inner.live_value(key).map(str::to_owned);
        let matches = match expect {
            None => current.is_none(),
            Some(e) => current.as_deref() == Some(e),
        };
        if !matches {
            return Ok(false);
        }
        inner.kv.insert(
            key.to_owned(),
            ValueEntry { value: new.to_owned(), expires_at: ttl.map(|t| Instant::now() + t) },
        );
        Ok(true)
    }

    pub async fn zadd(&self, key: &str, score: i64, member: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .zsets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned(), score);
        Ok(())
    }

    pub async fn zrange_by_score(
        &self,
        key: &str,
        lo: i64,
        hi: i64,
    ) -> anyhow::Result<Vec<String>> {
        let inner = self.inner.lock().await;
        let mut hits: Vec<(i64, String)> = inner
            .zsets
            .get(key)
            .map(|set| {
                set.iter()
                    .filter(|(_, &score)| score >= lo && score <= hi)
                    .map(|(member, &score)| (score, member.clone()))
                    .collect()
            })
            .unwrap_or_default();
        hits.sort();
        Ok(hits.into_iter().map(|(_, m)| m).collect())
    }

    pub async fn zrem_range_by_score(&self, key: &str, lo: i64, hi: i64) -> anyhow::Result<u64> {
        let mut inner = self.inner.lock().await;
        let Some(set) = inner.zsets.get_mut(key) else {
            return Ok(0);
        };
        let before = set.len();
        set.retain(|_, &mut score| score < lo || score > hi);
        let removed = (before - set.len()) as u64;
        if set.is_empty() {
            inner.zsets.remove(key);
        }
        Ok(removed)
    }

    pub async fn publish(&self, channel: &str, payload: &[u8]) -> anyhow::Result<()> {
        let sender = {
            let mut inner = self.inner.lock().await;
            inner.channel(channel)
        };
        // No receivers is not an error; the message is simply lost.
        let _ = sender.send(payload.to_vec());
        Ok(())
    }

    pub async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        let mut source = {
            let mut inner = self.inner.lock().await;
            inner.channel(channel).subscribe()
        };
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let cancel = CancellationToken::new();
        let guard_token = cancel.clone();

        tokio::spawn(async move {
            loop {
                let msg = tokio::select! {
                    _ = cancel.cancelled() => break,
                    msg = source.recv() => msg,
                };
                match msg {
                    // A lagged subscriber is closed rather than resumed
                    // with a gap; the client resyncs from the snapshot.
                    Ok(payload) => {
                        if tx.try_send(payload).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => break,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription { rx, _guard: guard_token.drop_guard() })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal glob matcher: `*` matches any run of characters.
fn glob_match(pattern: &str, input: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == input;
    }
    let mut rest = match input.strip_prefix(segments[0]) {
        Some(r) => r,
        None => return false,
    };
    for seg in &segments[1..segments.len() - 1] {
        if seg.is_empty() {
            continue;
        }
        match rest.find(seg) {
            Some(pos) => rest = &rest[pos + seg.len()..],
            None => return false,
        }
    }
    let last = segments[segments.len() - 1];
    last.is_empty() || rest.ends_with(last)
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
