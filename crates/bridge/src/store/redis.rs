// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis store backend. Commands go through a shared `ConnectionManager`;
//! each subscription gets its own pub/sub connection. Every command is
//! bounded by the configured store timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use redis::AsyncCommands;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{Subscription, SUBSCRIBER_BUFFER};

/// Conditional write used for lease acquire and renew. Mode `nx` succeeds
/// only when the key is absent; mode `eq` only when the current value
/// equals ARGV[2]. A TTL of 0 stores without expiry.
const CAS_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if ARGV[1] == 'nx' then
  if current then return 0 end
elseif current ~= ARGV[2] then
  return 0
end
if tonumber(ARGV[4]) > 0 then
  redis.call('SET', KEYS[1], ARGV[3], 'EX', tonumber(ARGV[4]))
else
  redis.call('SET', KEYS[1], ARGV[3])
end
return 1
";

#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: redis::aio::ConnectionManager,
    cas: Arc<redis::Script>,
    timeout: Duration,
}

impl RedisStore {
    pub async fn connect(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = tokio::time::timeout(
            timeout.max(Duration::from_secs(5)),
            redis::aio::ConnectionManager::new(client.clone()),
        )
        .await
        .map_err(|_| anyhow::anyhow!("store connect: timed out"))??;
        Ok(Self { client, conn, cas: Arc::new(redis::Script::new(CAS_SCRIPT)), timeout })
    }

    async fn timed<T, F>(&self, op: &'static str, fut: F) -> anyhow::Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(|e| anyhow::anyhow!("store {op}: {e}")),
            Err(_) => Err(anyhow::anyhow!("store {op}: timed out")),
        }
    }

    pub async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        let key = key.to_owned();
        self.timed("get", async move { conn.get(key).await }).await
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let key = key.to_owned();
        let value = value.to_owned();
        self.timed("set", async move {
            match ttl {
                Some(t) => conn.set_ex::<_, _, ()>(key, value, t.as_secs().max(1)).await,
                None => conn.set::<_, _, ()>(key, value).await,
            }
        })
        .await
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let key = key.to_owned();
        self.timed("del", async move { conn.del::<_, ()>(key).await }).await
    }

    pub async fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        let key = key.to_owned();
        self.timed("exists", async move { conn.exists(key).await }).await
    }

    pub async fn scan_keys(&self, pattern: &str) -> anyhow::Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = pattern.to_owned();
        self.timed("scan", async move {
            let mut cursor: u64 = 0;
            let mut keys = Vec::new();
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(200)
                    .query_async(&mut conn)
                    .await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            keys.sort();
            Ok(keys)
        })
        .await
    }

    pub async fn compare_and_set(
        &self,
        key: &str,
        expect: Option<&str>,
        new: &str,
        ttl: Option<Duration>,
    ) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        let script = Arc::clone(&self.cas);
        let key = key.to_owned();
        let (mode, expect) = match expect {
            Some(e) => ("eq", e.to_owned()),
            None => ("nx", String::new()),
        };
        let new = new.to_owned();
        let ttl_secs = ttl.map_or(0, |t| t.as_secs().max(1));
        let flag: i64 = self
            .timed("cas", async move {
                script
                    .key(key)
                    .arg(mode)
                    .arg(expect)
                    .arg(new)
                    .arg(ttl_secs)
                    .invoke_async(&mut conn)
                    .await
            })
            .await?;
        Ok(flag == 1)
    }

    pub async fn zadd(&self, key: &str, score: i64, member: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let key = key.to_owned();
        let member = member.to_owned();
        self.timed("zadd", async move { conn.zadd::<_, _, _, ()>(key, member, score).await })
            .await
    }

    pub async fn zrange_by_score(
        &self,
        key: &str,
        lo: i64,
        hi: i64,
    ) -> anyhow::Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let key = key.to_owned();
        self.timed("zrangebyscore", async move { conn.zrangebyscore(key, lo, hi).await })
            .await
    }

    pub async fn zrem_range_by_score(&self, key: &str, lo: i64, hi: i64) -> anyhow::Result<u64> {
        let mut conn = self.conn.clone();
        let key = key.to_owned();
        self.timed("zrembyscore", async move { conn.zrembyscore(key, lo, hi).await })
            .await
    }

    pub async fn publish(&self, channel: &str, payload: &[u8]) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let channel = channel.to_owned();
        let payload = payload.to_vec();
        self.timed("publish", async move { conn.publish::<_, _, ()>(channel, payload).await })
            .await
    }

    pub async fn subscribe(&self, channel: &str) -> anyhow::Result<Subscription> {
        let mut pubsub = tokio::time::timeout(self.timeout, self.client.get_async_pubsub())
            .await
            .map_err(|_| anyhow::anyhow!("store subscribe: timed out"))??;
        pubsub.subscribe(channel).await?;

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut stream = pubsub.on_message();
            loop {
                let msg = tokio::select! {
                    _ = token.cancelled() => break,
                    msg = stream.next() => msg,
                };
                let Some(msg) = msg else { break };
                let payload = msg.get_payload_bytes().to_vec();
                // A full buffer closes the subscription; the subscriber
                // reconnects and resyncs from the latest snapshot.
                if tx.try_send(payload).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription { rx, _guard: cancel.drop_guard() })
    }
}
