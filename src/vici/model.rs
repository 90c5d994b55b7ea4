// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Typed views over [`crate::vici::wire::Value`] trees: IKE/child SA
//! configuration and runtime state, decoded without a JSON round trip.

use std::collections::HashMap;

use crate::vici::{
    error::ViciError,
    wire::{OrderedMap, Value},
};

fn section<'a>(map: &'a OrderedMap, key: &str) -> Option<&'a OrderedMap> {
    map.get(key).and_then(Value::as_section)
}

fn str_field(map: &OrderedMap, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn list_field(map: &OrderedMap, key: &str) -> Vec<String> {
    map.get(key).and_then(Value::as_list).map(<[String]>::to_vec).unwrap_or_default()
}

/// Strips a `##N` duplicate-key suffix so sibling sections decode under
/// their logical name (see [`crate::vici::wire::OrderedMap::insert_dedup`]).
fn base_name(key: &str) -> &str {
    key.split("##").next().unwrap_or(key)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthConf {
    pub class: Option<String>,
    pub eap_type: Option<String>,
    pub eap_vendor: Option<String>,
    pub xauth: Option<String>,
    pub revocation_policy: Option<String>,
    pub ike_identity: Option<String>,
    pub aaa_id: Option<String>,
    pub eap_id: Option<String>,
    pub xauth_id: Option<String>,
    pub groups: Vec<String>,
    pub certs: Vec<String>,
    pub cacerts: Vec<String>,
}

impl AuthConf {
    fn from_section(m: &OrderedMap) -> Self {
        Self {
            class: str_field(m, "class"),
            eap_type: str_field(m, "eap-type"),
            eap_vendor: str_field(m, "eap-vendor"),
            xauth: str_field(m, "xauth"),
            revocation_policy: str_field(m, "revocation"),
            ike_identity: str_field(m, "id"),
            aaa_id: str_field(m, "aaa_id"),
            eap_id: str_field(m, "eap_id"),
            xauth_id: str_field(m, "xauth_id"),
            groups: list_field(m, "groups"),
            certs: list_field(m, "certs"),
            cacerts: list_field(m, "cacerts"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildSAConf {
    pub local_ts: Vec<String>,
    pub remote_ts: Vec<String>,
    pub esp_proposals: Vec<String>,
    pub start_action: Option<String>,
    pub close_action: Option<String>,
    pub reqid: Option<String>,
    pub rekey_time: Option<String>,
    pub replay_window: Option<String>,
    pub mode: Option<String>,
    pub policies: Option<String>,
    pub updown: Option<String>,
    pub priority: Option<String>,
    pub mark_in: Option<String>,
    pub mark_out: Option<String>,
    pub dpd_action: Option<String>,
    pub life_time: Option<String>,
    pub rekey_bytes: Option<String>,
    pub rekey_packets: Option<String>,
}

impl ChildSAConf {
    fn from_section(m: &OrderedMap) -> Self {
        Self {
            local_ts: list_field(m, "local_ts"),
            remote_ts: list_field(m, "remote_ts"),
            esp_proposals: list_field(m, "esp_proposals"),
            start_action: str_field(m, "start_action"),
            close_action: str_field(m, "close_action"),
            reqid: str_field(m, "reqid"),
            rekey_time: str_field(m, "rekey_time"),
            replay_window: str_field(m, "replay_window"),
            mode: str_field(m, "mode"),
            policies: str_field(m, "policies"),
            updown: str_field(m, "updown"),
            priority: str_field(m, "priority"),
            mark_in: str_field(m, "mark_in"),
            mark_out: str_field(m, "mark_out"),
            dpd_action: str_field(m, "dpd_action"),
            life_time: str_field(m, "life_time"),
            rekey_bytes: str_field(m, "rekey_bytes"),
            rekey_packets: str_field(m, "rekey_packets"),
        }
    }

    /// Parses `rekey_time` (seconds, as a string per VICI convention) into a
    /// number, used by the rekey-window histogram derivation.
    pub fn rekey_time_seconds(&self) -> Option<f64> {
        self.rekey_time.as_deref().and_then(|s| s.parse().ok())
    }
}

/// A configured IKE connection (`list-conn` / `load-conn` shape).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IKEConf {
    pub ike_version: Option<String>,
    pub local_addrs: Vec<String>,
    pub remote_addrs: Vec<String>,
    pub local_port: Option<String>,
    pub remote_port: Option<String>,
    pub proposals: Vec<String>,
    pub vips: Vec<String>,
    pub aggressive: Option<String>,
    pub pull: Option<String>,
    pub dscp: Option<String>,
    pub encap: Option<String>,
    pub mobike: Option<String>,
    pub reauth_time: Option<String>,
    pub rekey_time: Option<String>,
    pub dpd_delay: Option<String>,
    pub dpd_timeout: Option<String>,
    pub fragmentation: Option<String>,
    pub childless: Option<String>,
    pub send_certreq: Option<String>,
    pub send_cert: Option<String>,
    pub ppk_id: Option<String>,
    pub ppk_required: Option<String>,
    pub keyingtries: Option<String>,
    pub unique: Option<String>,
    pub over_time: Option<String>,
    pub rand_time: Option<String>,
    pub pools: Vec<String>,
    pub if_id_in: Option<String>,
    pub if_id_out: Option<String>,
    pub mediation: Option<String>,
    pub mediated_by: Option<String>,
    pub mediation_peer: Option<String>,
    /// `local*`/`remote*` auth sections are siblings of these fields in the
    /// wire map, not nested under them — decoded in a second pass over the
    /// same section by [`IKEConf::from_section`].
    pub local_auth: HashMap<String, AuthConf>,
    pub remote_auth: HashMap<String, AuthConf>,
    pub children: HashMap<String, ChildSAConf>,
}

impl IKEConf {
    /// Decodes a single `conn_name -> IKEConf` entry's section body.
    ///
    /// Auth sub-sections (`local`, `local-1`, `remote-eap`, ...) live as
    /// siblings of the scalar fields rather than under a nested key, so this
    /// does two passes: one for known scalar/list fields, one for every
    /// remaining section keyed `local*`/`remote*`.
    pub fn from_section(m: &OrderedMap) -> Self {
        let mut conf = Self {
            ike_version: str_field(m, "version"),
            local_addrs: list_field(m, "local_addrs"),
            remote_addrs: list_field(m, "remote_addrs"),
            local_port: str_field(m, "local_port"),
            remote_port: str_field(m, "remote_port"),
            proposals: list_field(m, "proposals"),
            vips: list_field(m, "vips"),
            aggressive: str_field(m, "aggressive"),
            pull: str_field(m, "pull"),
            dscp: str_field(m, "dscp"),
            encap: str_field(m, "encap"),
            mobike: str_field(m, "mobike"),
            reauth_time: str_field(m, "reauth_time"),
            rekey_time: str_field(m, "rekey_time"),
            dpd_delay: str_field(m, "dpd_delay"),
            dpd_timeout: str_field(m, "dpd_timeout"),
            fragmentation: str_field(m, "fragmentation"),
            childless: str_field(m, "childless"),
            send_certreq: str_field(m, "send_certreq"),
            send_cert: str_field(m, "send_cert"),
            ppk_id: str_field(m, "ppk_id"),
            ppk_required: str_field(m, "ppk_required"),
            keyingtries: str_field(m, "keyingtries"),
            unique: str_field(m, "unique"),
            over_time: str_field(m, "over_time"),
            rand_time: str_field(m, "rand_time"),
            pools: list_field(m, "pools"),
            if_id_in: str_field(m, "if_id_in"),
            if_id_out: str_field(m, "if_id_out"),
            mediation: str_field(m, "mediation"),
            mediated_by: str_field(m, "mediated_by"),
            mediation_peer: str_field(m, "mediation_peer"),
            local_auth: HashMap::new(),
            remote_auth: HashMap::new(),
            children: HashMap::new(),
        };

        if let Some(children) = section(m, "children") {
            for (name, value) in children.iter() {
                if let Value::Section(child) = value {
                    conf.children.insert(base_name(name).to_string(), ChildSAConf::from_section(child));
                }
            }
        }

        for (key, value) in m.iter() {
            let Value::Section(s) = value else { continue };
            let base = base_name(key);
            if base == "local" || base.starts_with("local-") {
                conf.local_auth.insert(key.clone(), AuthConf::from_section(s));
            } else if base == "remote" || base.starts_with("remote-") {
                conf.remote_auth.insert(key.clone(), AuthConf::from_section(s));
            }
        }

        conf
    }
}

/// A single negotiated child SA (`list-sas` shape).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildSA {
    pub name: String,
    pub reqid: Option<String>,
    pub state: Option<String>,
    pub mode: Option<String>,
    pub protocol: Option<String>,
    pub encap: Option<String>,
    pub spi_in: Option<String>,
    pub spi_out: Option<String>,
    pub encr_alg: Option<String>,
    pub integ_alg: Option<String>,
    pub bytes_in: Option<String>,
    pub bytes_out: Option<String>,
    pub packets_in: Option<String>,
    pub packets_out: Option<String>,
    pub use_in: Option<String>,
    pub use_out: Option<String>,
    pub rekey_time: Option<String>,
    pub life_time: Option<String>,
    pub install_time: Option<String>,
    pub local_ts: Vec<String>,
    pub remote_ts: Vec<String>,
}

impl ChildSA {
    fn from_section(name: &str, m: &OrderedMap) -> Self {
        Self {
            name: name.to_string(),
            reqid: str_field(m, "reqid"),
            state: str_field(m, "state"),
            mode: str_field(m, "mode"),
            protocol: str_field(m, "protocol"),
            encap: str_field(m, "encap"),
            spi_in: str_field(m, "spi-in"),
            spi_out: str_field(m, "spi-out"),
            encr_alg: str_field(m, "encr-alg"),
            integ_alg: str_field(m, "integ-alg"),
            bytes_in: str_field(m, "bytes-in"),
            bytes_out: str_field(m, "bytes-out"),
            packets_in: str_field(m, "packets-in"),
            packets_out: str_field(m, "packets-out"),
            use_in: str_field(m, "use-in"),
            use_out: str_field(m, "use-out"),
            rekey_time: str_field(m, "rekey-time"),
            life_time: str_field(m, "life-time"),
            install_time: str_field(m, "install-time"),
            local_ts: list_field(m, "local-ts"),
            remote_ts: list_field(m, "remote-ts"),
        }
    }

    pub fn rekey_time_seconds(&self) -> Option<f64> {
        self.rekey_time.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn install_time_seconds(&self) -> Option<f64> {
        self.install_time.as_deref().and_then(|s| s.parse().ok())
    }
}

/// A single active IKE SA (`list-sas` shape).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IkeSa {
    pub uniqueid: Option<String>,
    pub version: Option<String>,
    pub state: Option<String>,
    pub local_host: Option<String>,
    pub local_port: Option<String>,
    pub local_id: Option<String>,
    pub remote_host: Option<String>,
    pub remote_port: Option<String>,
    pub remote_id: Option<String>,
    pub initiator: Option<String>,
    pub initiator_spi: Option<String>,
    pub responder_spi: Option<String>,
    pub encr_alg: Option<String>,
    pub integ_alg: Option<String>,
    pub prf_alg: Option<String>,
    pub dh_group: Option<String>,
    pub established: Option<String>,
    pub rekey_time: Option<String>,
    pub reauth_time: Option<String>,
    pub remote_vips: Vec<String>,
    pub child_sas: HashMap<String, ChildSA>,
}

impl IkeSa {
    /// Decodes a single `ike_name -> IkeSa` entry's section body.
    pub fn from_section(m: &OrderedMap) -> Self {
        let mut sa = Self {
            uniqueid: str_field(m, "uniqueid"),
            version: str_field(m, "version"),
            state: str_field(m, "state"),
            local_host: str_field(m, "local-host"),
            local_port: str_field(m, "local-port"),
            local_id: str_field(m, "local-id"),
            remote_host: str_field(m, "remote-host"),
            remote_port: str_field(m, "remote-port"),
            remote_id: str_field(m, "remote-id"),
            initiator: str_field(m, "initiator"),
            initiator_spi: str_field(m, "initiator-spi"),
            responder_spi: str_field(m, "responder-spi"),
            encr_alg: str_field(m, "encr-alg"),
            integ_alg: str_field(m, "integ-alg"),
            prf_alg: str_field(m, "prf-alg"),
            dh_group: str_field(m, "dh-group"),
            established: str_field(m, "established"),
            rekey_time: str_field(m, "rekey-time"),
            reauth_time: str_field(m, "reauth-time"),
            remote_vips: list_field(m, "remote-vips"),
            child_sas: HashMap::new(),
        };

        if let Some(children) = section(m, "child-sas") {
            for (name, value) in children.iter() {
                if let Value::Section(child) = value {
                    sa.child_sas.insert(base_name(name).to_string(), ChildSA::from_section(name, child));
                }
            }
        }

        sa
    }

    pub fn established_seconds(&self) -> Option<f64> {
        self.established.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Response to the `version` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Version {
    pub daemon: String,
    pub version: String,
    pub sysname: String,
    pub release: String,
    pub machine: String,
}

impl Version {
    pub fn decode(v: &Value) -> Result<Self, ViciError> {
        let m = v.as_section().ok_or_else(|| ViciError::Decode("version: expected section".into()))?;
        Ok(Self {
            daemon: str_field(m, "daemon").unwrap_or_default(),
            version: str_field(m, "version").unwrap_or_default(),
            sysname: str_field(m, "sysname").unwrap_or_default(),
            release: str_field(m, "release").unwrap_or_default(),
            machine: str_field(m, "machine").unwrap_or_default(),
        })
    }
}

/// Response to the `stats` command (subset relevant to this sidecar).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub uptime_running: Option<String>,
    pub uptime_since: Option<String>,
    pub ike_sas_total: Option<String>,
    pub ike_sas_half_open: Option<String>,
}

impl Stats {
    pub fn decode(v: &Value) -> Result<Self, ViciError> {
        let m = v.as_section().ok_or_else(|| ViciError::Decode("stats: expected section".into()))?;
        let uptime = section(m, "uptime");
        let ikesas = section(m, "ikesas");
        Ok(Self {
            uptime_running: uptime.and_then(|u| str_field(u, "running")),
            uptime_since: uptime.and_then(|u| str_field(u, "since")),
            ike_sas_total: ikesas.and_then(|i| str_field(i, "total")),
            ike_sas_half_open: ikesas.and_then(|i| str_field(i, "half-open")),
        })
    }
}

/// Decodes a `list-conns`/`list-conn`-shaped event body: a map from
/// connection name to its configuration (never a flat field map).
pub fn decode_conn_map(v: &Value) -> Result<HashMap<String, IKEConf>, ViciError> {
    let m = v.as_section().ok_or_else(|| ViciError::Decode("list-conn: expected section".into()))?;
    let mut out = HashMap::new();
    for (name, value) in m.iter() {
        if let Value::Section(s) = value {
            out.insert(base_name(name).to_string(), IKEConf::from_section(s));
        }
    }
    Ok(out)
}

/// Decodes a `list-sas`/`list-sa`-shaped event body: a map from IKE SA name
/// to its runtime state.
pub fn decode_sa_map(v: &Value) -> Result<HashMap<String, IkeSa>, ViciError> {
    let m = v.as_section().ok_or_else(|| ViciError::Decode("list-sa: expected section".into()))?;
    let mut out = HashMap::new();
    for (name, value) in m.iter() {
        if let Value::Section(s) = value {
            out.insert(base_name(name).to_string(), IkeSa::from_section(s));
        }
    }
    Ok(out)
}
