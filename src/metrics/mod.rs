//! Prometheus metrics sinks: IKE/child SA status, periodic-driver lifecycle,
//! and TCP-checker outcomes.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Lifecycle counters for [`crate::daemon::Daemon`] instances.
pub mod daemon;
/// Decrease/increase detection shared by the other metrics sinks.
pub mod helpers;
/// IKE/child SA status receiver exposing gauges and histograms.
pub mod ikesa;
/// TCP liveness check counters and gauges.
pub mod tcpchecker;
