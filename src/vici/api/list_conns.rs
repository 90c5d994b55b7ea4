// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use crate::vici::{
    error::ViciError,
    model::{IKEConf, decode_conn_map},
    session::Session,
    wire::{OrderedMap, Value},
};

const EVENT: &str = "list-conn";

/// Lists configured IKE connections, optionally filtered by `ike` name.
///
/// Registers the `list-conn` event before issuing `list-conns` and
/// unregisters it afterwards, on every exit path, draining whatever the
/// daemon streamed back in the meantime.
pub async fn list_conns(
    session: &Session,
    ike: Option<&str>,
) -> Result<HashMap<String, IKEConf>, ViciError> {
    let mut rx = session.register_event(EVENT).await?;

    let result = async {
        let mut payload = OrderedMap::new();
        if let Some(ike) = ike {
            payload.push("ike", Value::Str(ike.to_string()));
        }
        session.request("list-conns", payload).await?;

        let mut conns = HashMap::new();
        while let Ok(body) = rx.try_recv() {
            conns.extend(decode_conn_map(&body)?);
        }
        Ok(conns)
    }
    .await;

    let _ = session.unregister_event(EVENT).await;
    result
}
