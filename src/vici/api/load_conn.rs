// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::{api::check_success, error::ViciError, session::Session, wire::{OrderedMap, Value}};

/// Loads a connection definition. `conns` maps connection name to its
/// already-built wire section (callers assemble the section directly, the
/// same way [`Session::request`] accepts raw payloads, since this sidecar
/// only ever needs to mirror configuration it read back out via
/// [`crate::vici::api::list_conns::list_conns`]).
pub async fn load_conn(session: &Session, conns: OrderedMap) -> Result<(), ViciError> {
    let body = session.request("load-conn", conns).await?;
    check_success(&body)
}

pub async fn unload_conn(session: &Session, name: &str) -> Result<(), ViciError> {
    let mut payload = OrderedMap::new();
    payload.push("name", Value::Str(name.to_string()));
    let body = session.request("unload-conn", payload).await?;
    check_success(&body)
}
