// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for one upstream game server.

use std::time::Duration;

use reqwest::Client;

use crate::model::SessionInfo;
use crate::upstream::schedule::SESSION_INFO_ENDPOINT;

/// HTTP client wrapper for one upstream game server instance.
pub struct UpstreamClient {
    base_url: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(base_url: String) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let client = Client::builder().build().unwrap_or_default();
        Self { base_url: base_url.trim_end_matches('/').to_owned(), client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch one endpoint body. The timeout is per request: status polls
    /// run a tight deadline, heavy map endpoints a generous one.
    pub async fn get_json(
        &self,
        path: &str,
        timeout: Duration,
    ) -> anyhow::Result<serde_json::Value> {
        let resp = self.client.get(self.url(path)).timeout(timeout).send().await?;
        let value = resp.error_for_status()?.json().await?;
        Ok(value)
    }

    /// One-shot session-info probe.
    pub async fn session_info(&self, timeout: Duration) -> anyhow::Result<SessionInfo> {
        let value = self.get_json(SESSION_INFO_ENDPOINT, timeout).await?;
        let save_name = value
            .get("SaveName")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();
        let total_play_duration = value
            .get("TotalPlayDuration")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("session info missing TotalPlayDuration"))?;
        Ok(SessionInfo { save_name, total_play_duration })
    }
}
