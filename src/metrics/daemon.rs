// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use prometheus::{CounterVec, Opts, Registry};
use tracing::debug;

use crate::daemon::Reporter;

/// Wires a [`crate::daemon::Daemon`]'s lifecycle probes to Prometheus
/// counters and debug-level logs, labeled by daemon name.
pub struct DaemonReporter {
    name: String,
    started: CounterVec,
    stopped: CounterVec,
    ticked: CounterVec,
    skipped: CounterVec,
}

impl DaemonReporter {
    pub fn register(registry: &Registry, name: &str) -> Result<Self, prometheus::Error> {
        let started = CounterVec::new(Opts::new("daemon_started_total", "daemon start count"), &["name"])?;
        let stopped = CounterVec::new(Opts::new("daemon_stopped_total", "daemon stop count"), &["name"])?;
        let ticked = CounterVec::new(Opts::new("daemon_ticked_total", "daemon tick count"), &["name"])?;
        let skipped = CounterVec::new(Opts::new("daemon_skipped_total", "daemon skipped-tick count"), &["name"])?;

        registry.register(Box::new(started.clone()))?;
        registry.register(Box::new(stopped.clone()))?;
        registry.register(Box::new(ticked.clone()))?;
        registry.register(Box::new(skipped.clone()))?;

        Ok(Self { name: name.to_string(), started, stopped, ticked, skipped })
    }
}

impl Reporter for DaemonReporter {
    fn started(&self, interval: Duration) {
        debug!("daemon {} started, interval {:?}", self.name, interval);
        self.started.with_label_values(&[&self.name]).inc();
    }

    fn stopped(&self) {
        debug!("daemon {} stopped", self.name);
        self.stopped.with_label_values(&[&self.name]).inc();
    }

    fn ticked(&self) {
        debug!("daemon {} ticked", self.name);
        self.ticked.with_label_values(&[&self.name]).inc();
    }

    fn skipped(&self) {
        debug!("daemon {} skipped a tick (already running)", self.name);
        self.skipped.with_label_values(&[&self.name]).inc();
    }
}
