// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed commands built on top of [`crate::vici::session::Session`].

pub mod authorities;
pub mod certs;
pub mod initiate;
pub mod list_conns;
pub mod list_sas;
pub mod load_conn;
pub mod monitor;
pub mod pools;
pub mod shared;
pub mod stats;
pub mod terminate;
pub mod version;

use crate::vici::{error::ViciError, wire::Value};

/// Checks the common `success: yes|no, errmsg: ...` reply convention used by
/// mutating commands (`initiate`, `terminate`, `load-*`, `unload-*`).
pub(crate) fn check_success(body: &Value) -> Result<(), ViciError> {
    let m = body
        .as_section()
        .ok_or_else(|| ViciError::Decode("expected a response section".into()))?;
    match m.get("success").and_then(Value::as_str) {
        Some("yes") => Ok(()),
        _ => {
            let msg = m.get("errmsg").and_then(Value::as_str).unwrap_or("unknown error");
            Err(ViciError::CommandFailed(msg.to_string()))
        },
    }
}
