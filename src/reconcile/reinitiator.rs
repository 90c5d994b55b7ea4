// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Observes reconciled statuses and re-initiates any configured child SA
//! that has no runtime state, one at a time, process-wide.
//!
//! Single-flight is global rather than per-child: a single capacity-1
//! channel hands at most one fully-qualified child name to the worker at a
//! time, and while the worker is busy every other missing child is skipped
//! (rate-limited to one skip log per name per 30s) until the next tick.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::{
    reconcile::status::{IKESAStatus, StatusReceiver},
    vici::{api::initiate::initiate, session::Session},
};

const SKIP_LOG_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Idle,
    Initiating(String),
}

struct Inner {
    state: Mutex<State>,
    last_skip_logged: Mutex<HashMap<String, Instant>>,
    tx: mpsc::Sender<(String, String)>,
}

/// Fan-out receiver that drives child SA re-initiation.
pub struct Reinitiator {
    inner: Arc<Inner>,
}

impl Reinitiator {
    /// Spawns the single worker task and returns a receiver ready to be
    /// registered with a [`crate::reconcile::reconciler::Reconciler`].
    pub fn spawn(session: Arc<Session>) -> Self {
        let (tx, mut rx) = mpsc::channel::<(String, String)>(1);
        let inner = Arc::new(Inner {
            state: Mutex::new(State::Idle),
            last_skip_logged: Mutex::new(HashMap::new()),
            tx,
        });

        let worker_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            while let Some((ike, child)) = rx.recv().await {
                let fqname = format!("{ike}.{child}");
                info!("Initiating a Child SA for {fqname}");
                match initiate(&session, &child, Some(&ike)).await {
                    Ok(()) => info!("Initiated Child SA {fqname}"),
                    Err(e) => warn!("Failed to initiate Child SA {fqname}: {e}"),
                }
                *worker_inner.state.lock().expect("reinitiator state mutex poisoned") = State::Idle;
            }
        });

        Self { inner }
    }

    fn try_start(&self, ike: &str, child: &str) -> bool {
        let fqname = format!("{ike}.{child}");
        let mut state = self.inner.state.lock().expect("reinitiator state mutex poisoned");
        if *state != State::Idle {
            return false;
        }
        *state = State::Initiating(fqname.clone());
        drop(state);

        match self.inner.tx.try_send((ike.to_string(), child.to_string())) {
            Ok(()) => true,
            Err(_) => {
                *self.inner.state.lock().expect("reinitiator state mutex poisoned") = State::Idle;
                false
            },
        }
    }

    fn log_skip_rate_limited(&self, fqname: &str) {
        let mut last = self.inner.last_skip_logged.lock().expect("skip-log mutex poisoned");
        let now = Instant::now();
        let should_log = match last.get(fqname) {
            Some(t) => now.duration_since(*t) >= SKIP_LOG_INTERVAL,
            None => true,
        };
        if should_log {
            last.insert(fqname.to_string(), now);
            info!("Skipping re-initiation of {fqname}: another initiate is already in flight");
        }
    }
}

impl StatusReceiver for Reinitiator {
    fn ike_sa_status(&self, status: &IKESAStatus) {
        for child in &status.child_sa {
            if child.state.is_some() {
                continue;
            }
            let fqname = format!("{}.{}", status.name, child.name);
            if !self.try_start(&status.name, &child.name) {
                self.log_skip_rate_limited(&fqname);
            }
        }
    }
}
