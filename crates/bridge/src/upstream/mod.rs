// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream game-server access: HTTP client, request queue, cadence
//! schedule, and the cadenced pollers.

pub mod client;
pub mod poller;
pub mod queue;
pub mod schedule;
