// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Decrease/increase detection used to turn repeated absolute-value samples
//! (as reported by charon) into Prometheus counters and histogram
//! observations without double-counting a value that hasn't moved.

use std::{collections::HashMap, sync::Mutex};

use prometheus::{Counter, Gauge, Histogram};
use tracing::warn;

/// Tracks the previous value seen for each metric name, used to detect
/// resets (a decreasing "seconds since X" gauge means X happened again).
#[derive(Default)]
pub struct DecreaseDetector {
    previous: Mutex<HashMap<String, f64>>,
}

impl DecreaseDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` under `name`, returning `Some(previous_value)` if the
    /// new value is smaller than the stored one (a reset was detected).
    /// Always updates the stored value.
    fn max_value(&self, name: &str, value: f64) -> Option<f64> {
        let mut previous = self.previous.lock().expect("decrease-detector mutex poisoned");
        let prior = previous.insert(name.to_string(), value);
        match prior {
            Some(p) if p > value => Some(p),
            _ => None,
        }
    }

    /// Symmetric to [`DecreaseDetector::max_value`]: returns `Some(previous)`
    /// when the new value is an increase past the stored minimum.
    fn min_value(&self, name: &str, value: f64) -> Option<f64> {
        let mut previous = self.previous.lock().expect("decrease-detector mutex poisoned");
        let prior = previous.insert(name.to_string(), value);
        match prior {
            Some(p) if p < value => Some(p),
            _ => None,
        }
    }

    /// First-ever observation or a detected decrease both increment the
    /// counter once; a value that has only grown since the last sample does
    /// not.
    pub fn set_counter_by_max(&self, name: &str, counter: &Counter, value: f64) {
        let mut previous = self.previous.lock().expect("decrease-detector mutex poisoned");
        let is_first = !previous.contains_key(name);
        let decreased = previous.get(name).is_some_and(|p| *p > value);
        previous.insert(name.to_string(), value);
        drop(previous);
        if is_first || decreased {
            counter.inc();
        }
    }

    pub fn set_gauge(gauge: &Gauge, raw: &str, name: &str) {
        match raw.parse::<f64>() {
            Ok(v) => gauge.set(v),
            Err(e) => warn!("metrics: cannot parse {name}={raw:?} as f64: {e}"),
        }
    }

    pub fn set_gauge_by_max(&self, name: &str, gauge: &Gauge, value: f64) {
        if let Some(prior_max) = self.max_value(name, value) {
            gauge.set(prior_max);
        }
    }

    pub fn set_histogram_by_max(&self, name: &str, histogram: &Histogram, value: f64) {
        if let Some(previous) = self.max_value(name, value) {
            histogram.observe(previous);
        }
    }

    pub fn set_histogram_by_min(&self, name: &str, histogram: &Histogram, value: f64) {
        if let Some(previous) = self.min_value(name, value) {
            histogram.observe(previous);
        }
    }
}

#[cfg(test)]
mod tests {
    use prometheus::{Histogram, HistogramOpts};

    use super::*;

    #[test]
    fn counter_by_max_fires_on_first_sample_and_on_decrease() {
        let detector = DecreaseDetector::new();
        let counter = Counter::new("test_installs", "help").expect("counter");

        // sequence from the scenario this mirrors: [1, 2, 3, 1]
        detector.set_counter_by_max("k", &counter, 1.0); // first sample -> +1
        detector.set_counter_by_max("k", &counter, 2.0); // increase -> no-op
        detector.set_counter_by_max("k", &counter, 3.0); // increase -> no-op
        detector.set_counter_by_max("k", &counter, 1.0); // decrease -> +1

        assert_eq!(counter.get() as u64, 2);
    }

    #[test]
    fn histogram_by_min_observes_prior_minimum_on_increase() {
        let detector = DecreaseDetector::new();
        let histogram =
            Histogram::with_opts(HistogramOpts::new("test_rekey", "help")).expect("histogram");

        detector.set_histogram_by_min("k", &histogram, 10.0);
        detector.set_histogram_by_min("k", &histogram, 5.0); // new min, no observe yet
        detector.set_histogram_by_min("k", &histogram, 8.0); // increase past min -> observe 5.0

        assert_eq!(histogram.get_sample_count(), 1);
    }

    #[test]
    fn gauge_by_max_records_the_prior_peak_not_the_reset_value() {
        let detector = DecreaseDetector::new();
        let gauge = Gauge::new("test_established", "help").expect("gauge");

        detector.set_gauge_by_max("k", &gauge, 100.0); // first sample, no prior max
        assert_eq!(gauge.get(), 0.0);

        detector.set_gauge_by_max("k", &gauge, 200.0); // increase, no reset yet
        assert_eq!(gauge.get(), 0.0);

        detector.set_gauge_by_max("k", &gauge, 5.0); // reset detected -> records prior peak
        assert_eq!(gauge.get(), 200.0);
    }
}
