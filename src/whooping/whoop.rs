// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

/// The message exchanged between two sidecars for a heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Whoop {
    pub message: String,
    pub from: String,
    /// Milliseconds since the Unix epoch, set by the sender.
    pub timestamp: i64,
    #[serde(default)]
    pub remote_status: Option<WhoopRemoteStatus>,
}

/// A peer's self-reported status, echoed back in the reply.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WhoopRemoteStatus {
    pub open: bool,
    pub latency_ms: f64,
    pub drift_ms: f64,
}
