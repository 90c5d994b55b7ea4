// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Outcome of a single liveness check.
#[derive(Debug, Clone)]
pub struct Report {
    pub name: String,
    pub address: String,
    pub port: u16,
    pub open: bool,
    pub error: Option<String>,
}

/// Receives check outcomes. Implemented by [`crate::metrics::tcpchecker::TcpCheckerMetrics`]
/// and [`crate::tcpchecker::log_reporter::LogReporter`].
pub trait Reporter: Send + Sync {
    fn report(&self, report: &Report);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn report(&self, report: &Report) {
        (**self).report(report);
    }
}

/// Fans a single report out to every wrapped reporter.
pub struct CompositeReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl CompositeReporter {
    pub fn new(reporters: Vec<Box<dyn Reporter>>) -> Self {
        Self { reporters }
    }
}

impl Reporter for CompositeReporter {
    fn report(&self, report: &Report) {
        for r in &self.reporters {
            r.report(report);
        }
    }
}
