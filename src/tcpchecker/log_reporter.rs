// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::tcpchecker::reporter::{Report, Reporter};

const STILL_CLOSED_REPEAT: Duration = Duration::from_secs(5 * 60);

struct Tracked {
    open: bool,
    last_logged: Instant,
}

/// Logs on every open<->closed transition, and re-logs "still closed" no
/// more than once every 5 minutes while a port stays down.
pub struct LogReporter {
    state: Mutex<HashMap<String, Tracked>>,
}

impl LogReporter {
    pub fn new() -> Self {
        Self { state: Mutex::new(HashMap::new()) }
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for LogReporter {
    fn report(&self, report: &Report) {
        let key = format!("{}:{}:{}", report.name, report.address, report.port);
        let now = Instant::now();
        let mut state = self.state.lock().expect("log-reporter mutex poisoned");

        match state.get_mut(&key) {
            None => {
                if report.open {
                    info!("{} ({}:{}) is open", report.name, report.address, report.port);
                } else {
                    warn!("{} ({}:{}) is closed: {:?}", report.name, report.address, report.port, report.error);
                }
                state.insert(key, Tracked { open: report.open, last_logged: now });
            },
            Some(tracked) if tracked.open != report.open => {
                if report.open {
                    info!("{} ({}:{}) is now open", report.name, report.address, report.port);
                } else {
                    warn!("{} ({}:{}) is now closed: {:?}", report.name, report.address, report.port, report.error);
                }
                tracked.open = report.open;
                tracked.last_logged = now;
            },
            Some(tracked) if !report.open && now.duration_since(tracked.last_logged) >= STILL_CLOSED_REPEAT => {
                warn!("{} ({}:{}) still closed: {:?}", report.name, report.address, report.port, report.error);
                tracked.last_logged = now;
            },
            Some(_) => {},
        }
    }
}
