// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Long-lived event subscription, a supplement beyond the core status
//! reconciler's poll loop: registers the four IKE/child up-down/rekey event
//! streams and feeds a callback, using `stats` on a watchdog interval as a
//! liveness check the way the original system's `MonitorSA` did.

use std::time::Duration;

use tokio::time::interval;
use tracing::warn;

use crate::vici::{api::stats::stats, error::ViciError, session::Session, wire::Value};

const EVENTS: [&str; 4] = ["ike-updown", "ike-rekey", "child-updown", "child-rekey"];

/// Subscribes to IKE/child SA lifecycle events until `session` is closed or
/// a watchdog `stats` call fails, invoking `callback` for every event body
/// with the event name it came from.
pub async fn monitor(
    session: &Session,
    watchdog: Duration,
    mut callback: impl FnMut(&str, Value) + Send,
) -> Result<(), ViciError> {
    let mut receivers = Vec::with_capacity(EVENTS.len());
    for name in EVENTS {
        receivers.push((name, session.register_event(name).await?));
    }

    let result = async {
        let mut tick = interval(watchdog);
        loop {
            let mut any_event = false;
            for (name, rx) in &mut receivers {
                while let Ok(body) = rx.try_recv() {
                    any_event = true;
                    callback(name, body);
                }
            }
            if !any_event {
                tick.tick().await;
                if let Err(e) = stats(session).await {
                    warn!("monitor watchdog stats failed: {e}");
                    return Err(e);
                }
            }
        }
    }
    .await;

    for (name, _) in &receivers {
        let _ = session.unregister_event(name).await;
    }

    result
}
