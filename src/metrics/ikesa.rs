// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Prometheus exposition for reconciled IKE/child SA statuses.

use prometheus::{CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, exponential_buckets};
use tracing::error;

use crate::{
    metrics::helpers::DecreaseDetector,
    reconcile::status::{IKESAStatus, StatusReceiver},
};

/// Base/factor/count for the silence and lifetime histograms.
const SILENCE_LIFE_BUCKETS: (f64, f64, usize) = (15.0, 2.0, 14);
/// The rekey-window histogram uses fewer buckets than silence/lifetime in
/// the system this was derived from; preserved here rather than unified,
/// since the two measure different timescales (a rekey window vs. multi-day
/// tunnel lifetimes).
const REKEY_BUCKETS: (f64, f64, usize) = (15.0, 2.0, 12);

pub struct IkeSaMetrics {
    detector: DecreaseDetector,
    established_seconds: GaugeVec,
    packets_in: GaugeVec,
    packets_out: GaugeVec,
    bytes_in: GaugeVec,
    bytes_out: GaugeVec,
    last_packet_in_seconds: HistogramVec,
    last_packet_out_seconds: HistogramVec,
    installs_total: CounterVec,
    life_time_seconds: HistogramVec,
    rekey_seconds: HistogramVec,
}

impl IkeSaMetrics {
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let ike_labels = ["name", "local_peer_ip", "remote_peer_ip"];
        let child_labels = ["name", "local_peer_ip", "remote_peer_ip", "local_ts", "remote_ts", "child_name"];

        let established_seconds =
            GaugeVec::new(Opts::new("ike_sa_established_seconds", "seconds since the IKE SA was established"), &ike_labels)?;
        let packets_in = GaugeVec::new(Opts::new("child_sa_packets_in", "inbound packet count"), &child_labels)?;
        let packets_out = GaugeVec::new(Opts::new("child_sa_packets_out", "outbound packet count"), &child_labels)?;
        let bytes_in = GaugeVec::new(Opts::new("child_sa_bytes_in", "inbound byte count"), &child_labels)?;
        let bytes_out = GaugeVec::new(Opts::new("child_sa_bytes_out", "outbound byte count"), &child_labels)?;

        let silence_buckets = exponential_buckets(SILENCE_LIFE_BUCKETS.0, SILENCE_LIFE_BUCKETS.1, SILENCE_LIFE_BUCKETS.2)?;
        let last_packet_in_seconds = HistogramVec::new(
            HistogramOpts::new("child_sa_last_packet_in_seconds", "seconds of inbound silence before the last reset")
                .buckets(silence_buckets.clone()),
            &child_labels,
        )?;
        let last_packet_out_seconds = HistogramVec::new(
            HistogramOpts::new("child_sa_last_packet_out_seconds", "seconds of outbound silence before the last reset")
                .buckets(silence_buckets.clone()),
            &child_labels,
        )?;
        let life_time_seconds = HistogramVec::new(
            HistogramOpts::new("child_sa_life_time_seconds", "configured lifetime observed at reinstall")
                .buckets(silence_buckets),
            &child_labels,
        )?;

        let installs_total = CounterVec::new(Opts::new("child_sa_installs_total", "child SA (re)install count"), &child_labels)?;

        let rekey_buckets = exponential_buckets(REKEY_BUCKETS.0, REKEY_BUCKETS.1, REKEY_BUCKETS.2)?;
        let rekey_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ike_sa_rekey_window_seconds",
                "conn.rekey_time - min(child.rekey_time) observed at each new minimum",
            )
            .buckets(rekey_buckets),
            &ike_labels,
        )?;

        registry.register(Box::new(established_seconds.clone()))?;
        registry.register(Box::new(packets_in.clone()))?;
        registry.register(Box::new(packets_out.clone()))?;
        registry.register(Box::new(bytes_in.clone()))?;
        registry.register(Box::new(bytes_out.clone()))?;
        registry.register(Box::new(last_packet_in_seconds.clone()))?;
        registry.register(Box::new(last_packet_out_seconds.clone()))?;
        registry.register(Box::new(life_time_seconds.clone()))?;
        registry.register(Box::new(installs_total.clone()))?;
        registry.register(Box::new(rekey_seconds.clone()))?;

        Ok(Self {
            detector: DecreaseDetector::new(),
            established_seconds,
            packets_in,
            packets_out,
            bytes_in,
            bytes_out,
            last_packet_in_seconds,
            last_packet_out_seconds,
            installs_total,
            life_time_seconds,
            rekey_seconds,
        })
    }
}

fn parse(raw: &Option<String>) -> Option<f64> {
    raw.as_deref().and_then(|s| s.parse().ok())
}

fn set_gauge_raw(gauge: Gauge, raw: &Option<String>, name: &str) {
    if let Some(raw) = raw {
        DecreaseDetector::set_gauge(&gauge, raw, name);
    }
}

impl StatusReceiver for IkeSaMetrics {
    fn ike_sa_status(&self, status: &IKESAStatus) {
        let Some(state) = &status.state else {
            // No runtime state: nothing to observe yet, this connection has
            // never come up.
            return;
        };

        let ike_labels = [
            status.name.as_str(),
            state.local_host.as_deref().unwrap_or(""),
            state.remote_host.as_deref().unwrap_or(""),
        ];

        if let Some(seconds) = state.established_seconds() {
            let key = format!("established:{}", status.name);
            self.detector.set_gauge_by_max(&key, &self.established_seconds.with_label_values(&ike_labels), seconds);
        }

        let conn_rekey_time = parse(&status.configuration.rekey_time);
        let mut min_child_rekey: Option<f64> = None;

        for child in &status.child_sa {
            let Some(child_state) = &child.state else { continue };

            let child_labels = [
                status.name.as_str(),
                state.local_host.as_deref().unwrap_or(""),
                state.remote_host.as_deref().unwrap_or(""),
                child.configuration.local_ts.first().map(String::as_str).unwrap_or(""),
                child.configuration.remote_ts.first().map(String::as_str).unwrap_or(""),
                child.name.as_str(),
            ];

            if let Some(v) = child_state.install_time_seconds() {
                let key = format!("install:{}/{}", status.name, child.name);
                self.detector.set_counter_by_max(&key, &self.installs_total.with_label_values(&child_labels), v);
            }

            set_gauge_raw(self.packets_in.with_label_values(&child_labels), &child_state.packets_in, "packets_in");
            set_gauge_raw(self.packets_out.with_label_values(&child_labels), &child_state.packets_out, "packets_out");
            set_gauge_raw(self.bytes_in.with_label_values(&child_labels), &child_state.bytes_in, "bytes_in");
            set_gauge_raw(self.bytes_out.with_label_values(&child_labels), &child_state.bytes_out, "bytes_out");

            if let Some(v) = parse(&child_state.use_in) {
                let key = format!("last_in:{}/{}", status.name, child.name);
                self.detector.set_histogram_by_max(&key, &self.last_packet_in_seconds.with_label_values(&child_labels), v);
            }
            if let Some(v) = parse(&child_state.use_out) {
                let key = format!("last_out:{}/{}", status.name, child.name);
                self.detector.set_histogram_by_max(&key, &self.last_packet_out_seconds.with_label_values(&child_labels), v);
            }
            if let Some(v) = child_state.rekey_time_seconds() {
                min_child_rekey = Some(min_child_rekey.map_or(v, |cur: f64| cur.min(v)));
                let key = format!("life:{}/{}", status.name, child.name);
                if let Some(life) = parse(&child_state.life_time) {
                    self.detector.set_histogram_by_max(&key, &self.life_time_seconds.with_label_values(&child_labels), life);
                }
            }
        }

        if let (Some(conn_rekey), Some(min_child)) = (conn_rekey_time, min_child_rekey) {
            let key = format!("rekey_window:{}", status.name);
            // Observed window is elapsed time within the rekey cycle, capped
            // at zero: a transient negative reading (clock skew between
            // conn/child snapshots) is not a meaningful window.
            let window = (conn_rekey - min_child).max(0.0);
            self.detector.set_histogram_by_min(&key, &self.rekey_seconds.with_label_values(&ike_labels), window);
        } else if status.configuration.rekey_time.is_some() && min_child_rekey.is_none() {
            error!("ike_sa {}: configured rekey_time but no child reported one", status.name);
        }
    }
}
