// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::{error::ViciError, model::Version, session::Session, wire::OrderedMap};

/// Issues the `version` command.
pub async fn version(session: &Session) -> Result<Version, ViciError> {
    let body = session.request("version", OrderedMap::new()).await?;
    Version::decode(&body)
}
