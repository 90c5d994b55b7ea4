// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::collections::HashMap;

use crate::vici::{
    error::ViciError,
    model::{IkeSa, decode_sa_map},
    session::Session,
    wire::{OrderedMap, Value},
};

const EVENT: &str = "list-sa";

/// Lists active IKE SAs, optionally filtered by `ike` name or `ike_id`.
pub async fn list_sas(
    session: &Session,
    ike: Option<&str>,
    ike_id: Option<&str>,
) -> Result<HashMap<String, IkeSa>, ViciError> {
    let mut rx = session.register_event(EVENT).await?;

    let result = async {
        let mut payload = OrderedMap::new();
        if let Some(ike) = ike {
            payload.push("ike", Value::Str(ike.to_string()));
        }
        if let Some(ike_id) = ike_id {
            payload.push("ike-id", Value::Str(ike_id.to_string()));
        }
        session.request("list-sas", payload).await?;

        let mut sas = HashMap::new();
        while let Ok(body) = rx.try_recv() {
            sas.extend(decode_sa_map(&body)?);
        }
        Ok(sas)
    }
    .await;

    let _ = session.unregister_event(EVENT).await;
    result
}
