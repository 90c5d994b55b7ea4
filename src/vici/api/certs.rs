// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::{api::check_success, error::ViciError, session::Session, wire::{OrderedMap, Value}};

pub async fn load_cert(session: &Session, typ: &str, flag: &str, data: &str) -> Result<(), ViciError> {
    let mut payload = OrderedMap::new();
    payload.push("type", Value::Str(typ.to_string()));
    payload.push("flag", Value::Str(flag.to_string()));
    payload.push("data", Value::Str(data.to_string()));
    let body = session.request("load-cert", payload).await?;
    check_success(&body)
}
