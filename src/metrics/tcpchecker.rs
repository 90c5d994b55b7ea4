// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{collections::HashMap, sync::Mutex};

use prometheus::{CounterVec, GaugeVec, Opts, Registry};

use crate::tcpchecker::reporter::{Report, Reporter};

/// Prometheus sink for TCP liveness checks: a checks counter labeled by
/// outcome, an `open` gauge, and transition-only connect/disconnect
/// counters (only incremented when the open/closed state actually flips,
/// including the first observation).
pub struct TcpCheckerMetrics {
    checks: CounterVec,
    open: GaugeVec,
    connected_total: CounterVec,
    disconnected_total: CounterVec,
    previous_open: Mutex<HashMap<String, bool>>,
}

impl TcpCheckerMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let labels = ["name", "address", "port"];
        let open_labels = ["name", "address", "port", "open"];

        let checks = CounterVec::new(Opts::new("tcp_checker_checks_total", "check attempts"), &open_labels)?;
        let open = GaugeVec::new(Opts::new("tcp_checker_open", "1 if the port answered, else 0"), &labels)?;
        let connected_total = CounterVec::new(Opts::new("tcp_checker_connected_total", "open transitions"), &labels)?;
        let disconnected_total = CounterVec::new(Opts::new("tcp_checker_disconnected_total", "closed transitions"), &labels)?;

        registry.register(Box::new(checks.clone()))?;
        registry.register(Box::new(open.clone()))?;
        registry.register(Box::new(connected_total.clone()))?;
        registry.register(Box::new(disconnected_total.clone()))?;

        Ok(Self { checks, open, connected_total, disconnected_total, previous_open: Mutex::new(HashMap::new()) })
    }
}

impl Reporter for TcpCheckerMetrics {
    fn report(&self, report: &Report) {
        let port = report.port.to_string();
        let open_str = if report.open { "true" } else { "false" };
        self.checks.with_label_values(&[&report.name, &report.address, &port, open_str]).inc();
        self.open.with_label_values(&[&report.name, &report.address, &port]).set(if report.open { 1.0 } else { 0.0 });

        let key = format!("{}:{}:{}", report.name, report.address, report.port);
        let mut previous = self.previous_open.lock().expect("tcp-checker metrics mutex poisoned");
        let flipped = previous.insert(key, report.open) != Some(report.open);
        if flipped {
            if report.open {
                self.connected_total.with_label_values(&[&report.name, &report.address, &port]).inc();
            } else {
                self.disconnected_total.with_label_values(&[&report.name, &report.address, &port]).inc();
            }
        }
    }
}
