// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! KV/PubSub adapter over a Redis-like store.
//!
//! Two backends share one surface: the Redis backend used in production
//! and an in-memory backend the test suites run against. No operation is
//! transactional across keys; `compare_and_set` is the only atomic
//! cross-replica primitive.

pub mod keys;
pub mod memory;
pub mod redis;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

use self::memory::MemoryStore;
use self::redis::RedisStore;

/// Per-subscriber buffer. A subscriber that falls this far behind is
/// closed and expected to reconnect and resync from the latest snapshot.
pub const SUBSCRIBER_BUFFER: usize = 64;

/// Cloneable handle to the backing store.
#[derive(Clone)]
pub struct Store {
    inner: Backend,
}

#[derive(Clone)]
enum Backend {
    Redis(RedisStore),
    Memory(MemoryStore),
}

/// A live pub/sub subscription. Dropping it stops the forwarder task and
/// releases the underlying connection.
pub struct Subscription {
    pub(crate) rx: mpsc::Receiver<Vec<u8>>,
    pub(crate) _guard: DropGuard,
}

impl Subscription {
    /// Receive the next published message. Returns `None` once the
    /// subscription is closed — on publisher side errors or after this
    /// subscriber overflowed its buffer.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }
}

impl Store {
    /// Connect to Redis at `url`, with `timeout` applied to every command.
    pub async fn connect_redis(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let backend = RedisStore::connect(url, timeout).await?;
        Ok(Self { inner: Backend::Redis(backend) })
    }

    /// Fresh in-memory store.
    pub fn memory() -> Self {
        Self { inner: Backend::Memory(MemoryStore::new()) }
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        match &self.inner {
            Backend::Redis(s) => s.get(key).await,
            Backend::Memory(s) => s.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        match &self.inner {
            Backend::Redis(s) => s.set(key, value, ttl).await,
            Backend::Memory(s) => s.set(key, value, ttl).await,
        }
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        match &self.inner {
            Backend::Redis(s) => s.del(key).await,
            Backend::Memory(s) => s.del(key).await,
        }
    }

    pub async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        match &self.inner {
            Backend::Redis(s) => s.exists(key).await,
            Backend::Memory(s) => s.exists(key).await,
        }
    }

    /// All keys matching a glob pattern (`*` wildcards only).
    pub async fn scan_keys(&self, pattern: &str) -> anyhow::Result<Vec<String>> {
        match &self.inner {
            Backend::Redis(s) => s.scan_keys(pattern).await,
            Backend::Memory(s) => s.scan_keys(pattern).await,
        }
    }

    /// Atomic conditional write. `expect == None` succeeds only when the
    /// key is absent (or expired); `expect == Some(v)` only when the
    /// current value equals `v` byte for byte.
    pub async fn compare_and_set(
        &self,
        key: &str,
        expect: Option<&str>,
        new: &str,
        ttl: Option<Duration>,
    ) -> anyhow::Result<bool> {
        match &self.inner {
            Backend::Redis(s) => s.compare_and_set(key, expect, new, ttl).await,
            Backend::Memory(s) => s.compare_and_set(key, expect, new, ttl).await,
        }
    }

    pub async fn zadd(&self, key: &str, score: i64, member: &str) -> anyhow::Result<()> {
        match &self.inner {
            Backend::Redis(s) => s.zadd(key, score, member).await,
            Backend::Memory(s) => s.zadd(key, score, member).await,
        }
    }

    /// Members with `lo <= score <= hi`, ascending by score.
    pub async fn zrange_by_score(
        &self,
        key: &str,
        lo: i64,
        hi: i64,
    ) -> anyhow::Result<Vec<String>> {
        match &self.inner {
            Backend::Redis(s) => s.zrange_by_score(key, lo, hi).await,
            Backend::Memory(s) => s.zrange_by_score(key, lo, hi).await,
        }
    }

    /// Remove members with `lo <= score <= hi`; returns how many.
    pub async fn zrem_range_by_score(&self, key: &str, lo: i64, hi: i64) -> anyhow::Result<u64> {
        match &self.inner {
            Backend::Redis(s) => s.zrem_range_by_score(key, lo, hi).await,
            Backend::Memory(s) => s.zrem_range_by_score(key, lo, hi).await,
        }
    }

    pub async fn publish(&self, channel: &str, payload: &[u8]) -> anyhow::Result<()> {
        match &self.inner {
            Backend::Redis(s) => s.publish(channel, payload).await,
            Backend::Memory(s) => s.publish(channel, payload).await,
        }
    }

    /// Subscribe to a channel. Only messages published after this call are
    /// delivered; missed messages are acceptable by contract.
    pub async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        match &self.inner {
            Backend::Redis(s) => s.subscribe(channel).await,
            Backend::Memory(s) => s.subscribe(channel).await,
        }
    }
}
