// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use tracing::warn;

use crate::whooping::whoop::{Whoop, WhoopRemoteStatus};

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Tracks this sidecar's view of a peer: whether the last whoop got a reply,
/// and the measured latency/clock drift.
pub struct Whooper {
    from: String,
    open: AtomicBool,
    latency_ms: AtomicU64,
    drift_ms: AtomicU64,
    client: reqwest::Client,
}

impl Whooper {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            open: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            drift_ms: AtomicU64::new(0),
            client: reqwest::Client::new(),
        }
    }

    pub fn status(&self) -> WhoopRemoteStatus {
        WhoopRemoteStatus {
            open: self.open.load(Ordering::Relaxed),
            latency_ms: f64::from_bits(self.latency_ms.load(Ordering::Relaxed)),
            drift_ms: f64::from_bits(self.drift_ms.load(Ordering::Relaxed)),
        }
    }

    /// Answers an inbound whoop, as served by the HTTP `/whoop` handler.
    pub fn answer(&self, incoming: &Whoop) -> Result<Whoop, &'static str> {
        if incoming.message != "whoop" {
            return Err("unexpected message");
        }
        Ok(Whoop {
            message: "whoop whoop".to_string(),
            from: self.from.clone(),
            timestamp: now_millis(),
            remote_status: Some(self.status()),
        })
    }

    /// Sends a whoop to `endpoint` and updates latency/drift/open from the
    /// reply. Never returns an error: a failed peer is simply marked closed.
    pub async fn whoop(&self, endpoint: &str) {
        let sent_at = now_millis();
        let body = Whoop { message: "whoop".to_string(), from: self.from.clone(), timestamp: sent_at, remote_status: None };

        let reply = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let parsed = match reply {
            Ok(resp) => resp.json::<Whoop>().await.ok(),
            Err(e) => {
                warn!("whoop to {endpoint} failed: {e}");
                None
            },
        };

        match parsed {
            Some(reply) if reply.message == "whoop whoop" => {
                let received_at = now_millis();
                let latency = (received_at - sent_at) as f64;
                // Drift: how far the peer's clock was from ours at the
                // moment it stamped its reply, adjusted for one-way trip.
                let drift = reply.timestamp as f64 - (sent_at as f64 + latency / 2.0);

                self.open.store(true, Ordering::Relaxed);
                self.latency_ms.store(latency.to_bits(), Ordering::Relaxed);
                self.drift_ms.store(drift.to_bits(), Ordering::Relaxed);
            },
            _ => self.open.store(false, Ordering::Relaxed),
        }
    }
}
