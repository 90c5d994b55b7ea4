// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Generic "tick every N, drop if already in flight" scheduler, driven by a
//! capacity-1 channel: a full buffer means a tick is already pending, so the
//! ask is simply dropped rather than queued.

use std::{pin::Pin, sync::Arc, time::Duration};

use tokio::{
    sync::mpsc,
    time::{Instant, interval_at},
};
use tokio_util::sync::CancellationToken;

/// Lifecycle probes, wired to metrics/logging by callers (see
/// [`crate::metrics::daemon::DaemonReporter`]).
pub trait Reporter: Send + Sync {
    fn started(&self, _interval: Duration) {}
    fn stopped(&self) {}
    fn ticked(&self) {}
    fn skipped(&self) {}
}

/// A no-op reporter for callers that don't need lifecycle observability.
pub struct NoopReporter;
impl Reporter for NoopReporter {}

impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    fn started(&self, interval: Duration) {
        (**self).started(interval)
    }

    fn stopped(&self) {
        (**self).stopped()
    }

    fn ticked(&self) {
        (**self).ticked()
    }

    fn skipped(&self) {
        (**self).skipped()
    }
}

/// Drives a periodic `tick` callback without ever running two ticks
/// concurrently: if a tick is already executing when the timer fires again,
/// the new ask is dropped and `skipped()` fires instead.
pub struct Daemon<F, R> {
    interval: Duration,
    tick: F,
    reporter: R,
}

impl<F, Fut, R> Daemon<F, R>
where
    F: FnMut() -> Fut + Send,
    Fut: std::future::Future<Output = ()> + Send,
    R: Reporter,
{
    pub fn new(interval: Duration, tick: F, reporter: R) -> Self {
        Self { interval, tick, reporter }
    }

    /// Runs the scheduler until `cancel` fires.
    ///
    /// The in-flight tick is polled as its own `select!` branch (rather than
    /// awaited inline inside the `ask_rx.recv()` arm) so the timer branch
    /// keeps firing against the full cap-1 channel while a tick is still
    /// running, and `skipped()` fires for every interval that elapses during
    /// it.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.reporter.started(self.interval);

        let (ask_tx, mut ask_rx) = mpsc::channel::<()>(1);
        let mut timer = interval_at(Instant::now(), self.interval);
        let mut in_flight: Option<Pin<Box<Fut>>> = None;

        // Ask for an immediate first tick.
        let _ = ask_tx.try_send(());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.reporter.stopped();
                    return;
                },
                _ = ask_rx.recv(), if in_flight.is_none() => {
                    in_flight = Some(Box::pin((self.tick)()));
                },
                _ = async { in_flight.as_mut().expect("guarded by in_flight.is_some()").await }, if in_flight.is_some() => {
                    in_flight = None;
                    self.reporter.ticked();
                    timer.reset();
                },
                _ = timer.tick() => {
                    if ask_tx.try_send(()).is_err() {
                        self.reporter.skipped();
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[tokio::test]
    async fn ticks_do_not_overlap_and_stop_on_cancel() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let ticks_cloned = Arc::clone(&ticks);
        let daemon = Daemon::new(
            Duration::from_millis(20),
            move || {
                let ticks = Arc::clone(&ticks_cloned);
                async move {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            },
            NoopReporter,
        );

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(daemon.run(cancel_clone));

        tokio::time::sleep(Duration::from_millis(75)).await;
        cancel.cancel();
        handle.await.expect("daemon task panicked");

        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }

    #[derive(Default)]
    struct CountingReporter {
        skipped: AtomicUsize,
    }
    impl Reporter for CountingReporter {
        fn skipped(&self) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn skipped_fires_while_a_long_tick_is_in_flight() {
        let cancel = CancellationToken::new();
        let reporter = Arc::new(CountingReporter::default());

        let daemon = Daemon::new(
            Duration::from_millis(10),
            move || async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
            },
            Arc::clone(&reporter),
        );

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(daemon.run(cancel_clone));

        tokio::time::sleep(Duration::from_millis(60)).await;
        cancel.cancel();
        handle.await.expect("daemon task panicked");

        assert!(reporter.skipped.load(Ordering::SeqCst) >= 1);
    }
}
