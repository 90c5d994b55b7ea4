// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::vici::model::{ChildSA, ChildSAConf, IKEConf, IkeSa};

/// The reconciled view of a single child SA: its configuration, its runtime
/// state if the daemon reports one, or both.
#[derive(Debug, Clone)]
pub struct ChildSAStatus {
    pub name: String,
    pub configuration: ChildSAConf,
    pub state: Option<ChildSA>,
}

/// The reconciled view of a single IKE SA: configuration, runtime state if
/// present, and the union-joined list of its child SAs.
#[derive(Debug, Clone)]
pub struct IKESAStatus {
    pub name: String,
    pub configuration: IKEConf,
    pub state: Option<IkeSa>,
    pub child_sa: Vec<ChildSAStatus>,
}

/// Receives reconciled statuses on every reconciliation tick. Implemented by
/// metrics sinks and the re-initiator.
pub trait StatusReceiver: Send + Sync {
    fn ike_sa_status(&self, status: &IKESAStatus);
}
