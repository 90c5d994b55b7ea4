// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::{api::check_success, error::ViciError, session::Session, wire::{OrderedMap, Value}};

/// Parameters accepted by the `terminate` command.
#[derive(Debug, Clone, Default)]
pub struct TerminateRequest {
    pub child: Option<String>,
    pub ike: Option<String>,
    pub child_id: Option<String>,
    pub ike_id: Option<String>,
    pub force: bool,
    pub timeout_ms: Option<u64>,
}

pub async fn terminate(session: &Session, req: TerminateRequest) -> Result<(), ViciError> {
    let mut payload = OrderedMap::new();
    if let Some(v) = req.child {
        payload.push("child", Value::Str(v));
    }
    if let Some(v) = req.ike {
        payload.push("ike", Value::Str(v));
    }
    if let Some(v) = req.child_id {
        payload.push("child-id", Value::Str(v));
    }
    if let Some(v) = req.ike_id {
        payload.push("ike-id", Value::Str(v));
    }
    if req.force {
        payload.push("force", Value::Str("yes".into()));
    }
    if let Some(v) = req.timeout_ms {
        payload.push("timeout", Value::Str(v.to_string()));
    }

    let body = session.request("terminate", payload).await?;
    check_success(&body)
}
