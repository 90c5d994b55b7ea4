// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::{api::check_success, error::ViciError, session::Session, wire::{OrderedMap, Value}};

pub async fn load_authority(session: &Session, authorities: OrderedMap) -> Result<(), ViciError> {
    let body = session.request("load-authority", authorities).await?;
    check_success(&body)
}

pub async fn unload_authority(session: &Session, name: &str) -> Result<(), ViciError> {
    let mut payload = OrderedMap::new();
    payload.push("name", Value::Str(name.to_string()));
    let body = session.request("unload-authority", payload).await?;
    check_success(&body)
}
