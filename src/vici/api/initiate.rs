// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use tracing::debug;

use crate::vici::{api::check_success, error::ViciError, session::Session, wire::{OrderedMap, Value}};

const CONTROL_LOG: &str = "control-log";

/// Initiates a child SA (and its parent IKE SA, if not already up).
///
/// Registers `control-log` for the duration of the call so charon's progress
/// messages are forwarded to the tracing log, and always unregisters it
/// afterwards regardless of whether the initiate itself succeeded.
pub async fn initiate(session: &Session, child: &str, ike: Option<&str>) -> Result<(), ViciError> {
    let mut rx = session.register_event(CONTROL_LOG).await?;

    let drain = tokio::spawn(async move {
        while let Some(body) = rx.recv().await {
            if let Some(m) = body.as_section()
                && let Some(msg) = m.get("msg").and_then(Value::as_str)
            {
                debug!(target: "vici::control-log", "{msg}");
            }
        }
    });

    let mut payload = OrderedMap::new();
    payload.push("child", Value::Str(child.to_string()));
    if let Some(ike) = ike {
        payload.push("ike", Value::Str(ike.to_string()));
    }

    let result = session.request("initiate", payload).await.and_then(|body| check_success(&body));

    let _ = session.unregister_event(CONTROL_LOG).await;
    drain.abort();

    result.map_err(|e| match e {
        ViciError::CommandFailed(msg) => ViciError::InitiateFailed(msg),
        other => other,
    })
}
