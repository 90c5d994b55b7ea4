// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

/// A single `name:address:port` TCP liveness check, parsed from
/// `--tcp-checker`.
#[derive(Debug, Clone)]
pub struct TcpCheckerArg {
    pub name: String,
    pub address: String,
    pub port: u16,
}

impl std::str::FromStr for TcpCheckerArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [address, port] => Ok(Self {
                name: format!("{address}:{port}"),
                address: address.to_string(),
                port: port.parse().map_err(|_| format!("invalid port in {s:?}"))?,
            }),
            [name, address, port] => Ok(Self {
                name: name.to_string(),
                address: address.to_string(),
                port: port.parse().map_err(|_| format!("invalid port in {s:?}"))?,
            }),
            _ => Err(format!("expected name:address:port or address:port, got {s:?}")),
        }
    }
}

/// VICI sidecar for strongSwan: reconciles configured IKE connections
/// against active SAs, exposes metrics, optionally re-initiates missing
/// child SAs and probes peer TCP liveness.
#[derive(Debug, Parser, Clone)]
#[command(name = "vici-duckling", version, about)]
pub struct Cli {
    /// HTTP listen address for `/metrics` and `/whoop`.
    #[arg(long, default_value = "0.0.0.0:9100")]
    pub listen: String,

    /// Path to the VICI Unix domain socket.
    #[arg(long, default_value = "/var/run/charon.vici")]
    pub vici_socket: String,

    /// Seconds between status-reconciliation ticks.
    #[arg(long, default_value_t = 60)]
    pub reconcile_interval_secs: u64,

    /// Re-initiate configured child SAs that have no runtime state.
    #[arg(long)]
    pub enable_reinitiator: bool,

    /// Subscribe to IKE/child up-down/rekey events in addition to polling.
    #[arg(long)]
    pub monitor: bool,

    /// HTTP endpoint of a peer to whoop, e.g. `http://peer:9100/whoop`.
    #[arg(long)]
    pub whoop_peer: Option<String>,

    /// Seconds between outbound whoops, when `--whoop-peer` is set.
    #[arg(long, default_value_t = 30)]
    pub whoop_interval_secs: u64,

    /// Repeatable `name:address:port` (or `address:port`) TCP liveness checks.
    #[arg(long = "tcp-checker")]
    pub tcp_checkers: Vec<TcpCheckerArg>,

    /// Seconds between TCP checker probes.
    #[arg(long, default_value_t = 5)]
    pub tcp_checker_interval_secs: u64,

    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, value_enum, default_value_t = LogOutput::Stdout)]
    pub log_output: LogOutput,

    /// Required when `--log-output file` is set.
    #[arg(long)]
    pub log_file: Option<String>,
}
