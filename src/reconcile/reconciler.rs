// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Joins configured IKE connections against active IKE SAs by name, and
//! each connection's configured children against its SA's active children,
//! fanning the result out to every registered [`StatusReceiver`].

use std::collections::HashSet;

use tracing::error;

use crate::{
    reconcile::status::{ChildSAStatus, IKESAStatus, StatusReceiver},
    vici::{
        api::{list_conns::list_conns, list_sas::list_sas},
        error::ViciError,
        model::{IKEConf, IkeSa},
        session::Session,
    },
};

/// Owns the fan-out list of receivers and runs one reconciliation pass.
pub struct Reconciler {
    receivers: Vec<Box<dyn StatusReceiver>>,
}

impl Reconciler {
    pub fn new(receivers: Vec<Box<dyn StatusReceiver>>) -> Self {
        Self { receivers }
    }

    /// Fetches configured connections and active SAs, joins them, and fans
    /// the resulting statuses out to every receiver. Logs and skips any
    /// connection or SA with no counterpart on the other side, rather than
    /// failing the whole tick.
    pub async fn collect(&self, session: &Session) -> Result<(), ViciError> {
        let conns = list_conns(session, None).await?;
        let sas = list_sas(session, None, None).await?;

        let names: HashSet<&String> = conns.keys().chain(sas.keys()).collect();

        for name in names {
            let conf = conns.get(name);
            let sa = sas.get(name);

            let status = match (conf, sa) {
                (Some(conf), Some(sa)) => map_status(name, conf, Some(sa)),
                (Some(conf), None) => map_status(name, conf, None),
                (None, Some(_)) => {
                    error!("Unexpected IKE_SA Status for unconfigured connection {name}");
                    continue;
                },
                (None, None) => unreachable!("name came from the union of both maps"),
            };

            for receiver in &self.receivers {
                receiver.ike_sa_status(&status);
            }
        }

        Ok(())
    }
}

fn map_status(name: &str, conf: &IKEConf, sa: Option<&IkeSa>) -> IKESAStatus {
    let empty_children: std::collections::HashMap<String, crate::vici::model::ChildSA> =
        std::collections::HashMap::new();
    let state_children = sa.map(|s| &s.child_sas).unwrap_or(&empty_children);

    let child_names: HashSet<&String> = conf.children.keys().chain(state_children.keys()).collect();

    let mut child_sa = Vec::with_capacity(child_names.len());
    for child_name in child_names {
        let child_conf = conf.children.get(child_name);
        let child_state = state_children.get(child_name);

        match (child_conf, child_state) {
            (Some(cc), state) => child_sa.push(ChildSAStatus {
                name: child_name.clone(),
                configuration: cc.clone(),
                state: state.cloned(),
            }),
            (None, Some(_)) => {
                error!("Unexpected CHILD_SA Status for unconfigured child {child_name} of {name}");
            },
            (None, None) => unreachable!("name came from the union of both maps"),
        }
    }

    IKESAStatus {
        name: name.to_string(),
        configuration: conf.clone(),
        state: sa.cloned(),
        child_sa,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vici::model::{ChildSA, ChildSAConf};

    fn conf_with_child(name: &str) -> IKEConf {
        let mut conf = IKEConf::default();
        conf.children.insert(name.to_string(), ChildSAConf::default());
        conf
    }

    #[test]
    fn config_only_yields_no_state() {
        let conf = conf_with_child("c1");
        let status = map_status("ike1", &conf, None);
        assert_eq!(status.name, "ike1");
        assert!(status.state.is_none());
        assert_eq!(status.child_sa.len(), 1);
        assert!(status.child_sa[0].state.is_none());
    }

    #[test]
    fn config_and_state_join_children_by_name() {
        let conf = conf_with_child("c1");
        let mut sa = IkeSa::default();
        sa.child_sas.insert("c1".to_string(), ChildSA { name: "c1".into(), ..Default::default() });
        sa.child_sas.insert("c2".to_string(), ChildSA { name: "c2".into(), ..Default::default() });

        let status = map_status("ike1", &conf, Some(&sa));
        assert!(status.state.is_some());
        // c1 has config+state, c2 is unexpected (state-only) and dropped.
        assert_eq!(status.child_sa.len(), 1);
        assert_eq!(status.child_sa[0].name, "c1");
        assert!(status.child_sa[0].state.is_some());
    }
}
