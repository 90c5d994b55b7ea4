// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use crate::cfg::cli::{Cli, LogOutput};

/// A single configured TCP liveness check.
#[derive(Debug, Clone)]
pub struct TcpCheckerConfig {
    pub name: String,
    pub address: String,
    pub port: u16,
}

/// Resolved runtime configuration: CLI flags turned into typed values ready
/// for `main` to hand to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub vici_socket: String,
    pub reconcile_interval: Duration,
    pub enable_reinitiator: bool,
    pub monitor: bool,
    pub whoop_peer: Option<String>,
    pub whoop_interval: Duration,
    pub tcp_checkers: Vec<TcpCheckerConfig>,
    pub tcp_checker_interval: Duration,
    pub log_level: String,
    pub log_output: LogOutput,
    pub log_file: Option<String>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            listen: cli.listen,
            vici_socket: cli.vici_socket,
            reconcile_interval: Duration::from_secs(cli.reconcile_interval_secs),
            enable_reinitiator: cli.enable_reinitiator,
            monitor: cli.monitor,
            whoop_peer: cli.whoop_peer,
            whoop_interval: Duration::from_secs(cli.whoop_interval_secs),
            tcp_checkers: cli
                .tcp_checkers
                .into_iter()
                .map(|t| TcpCheckerConfig { name: t.name, address: t.address, port: t.port })
                .collect(),
            tcp_checker_interval: Duration::from_secs(cli.tcp_checker_interval_secs),
            log_level: cli.log_level,
            log_output: cli.log_output,
            log_file: cli.log_file,
        }
    }
}
