// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::{api::check_success, error::ViciError, session::Session, wire::{OrderedMap, Value}};

pub async fn load_shared(session: &Session, shared: OrderedMap) -> Result<(), ViciError> {
    let body = session.request("load-shared", shared).await?;
    check_success(&body)
}

pub async fn unload_shared(session: &Session, id: &str) -> Result<(), ViciError> {
    let mut payload = OrderedMap::new();
    payload.push("id", Value::Str(id.to_string()));
    let body = session.request("unload-shared", payload).await?;
    check_success(&body)
}

pub async fn get_shared(session: &Session) -> Result<Value, ViciError> {
    session.request("get-shared", OrderedMap::new()).await
}

pub async fn load_key(session: &Session, typ: &str, data: &str) -> Result<(), ViciError> {
    let mut payload = OrderedMap::new();
    payload.push("type", Value::Str(typ.to_string()));
    payload.push("data", Value::Str(data.to_string()));
    let body = session.request("load-key", payload).await?;
    check_success(&body)
}
