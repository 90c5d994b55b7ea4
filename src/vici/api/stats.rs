// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::{error::ViciError, model::Stats, session::Session, wire::OrderedMap};

/// Issues the `stats` command, also used as a liveness probe by
/// [`crate::vici::api::monitor::monitor`].
pub async fn stats(session: &Session) -> Result<Stats, ViciError> {
    let body = session.request("stats", OrderedMap::new()).await?;
    Stats::decode(&body)
}
