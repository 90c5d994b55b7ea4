// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use tokio::{net::TcpStream, time::timeout};
use tokio_util::sync::CancellationToken;

use crate::tcpchecker::reporter::{Report, Reporter};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Attempts a single TCP connect to `address:port` and returns the outcome.
/// Never returns an `Err`: connect failures are reported as a closed port.
pub async fn check(name: &str, address: &str, port: u16) -> Report {
    let target = format!("{address}:{port}");
    match timeout(CONNECT_TIMEOUT, TcpStream::connect(&target)).await {
        Ok(Ok(_stream)) => {
            Report { name: name.to_string(), address: address.to_string(), port, open: true, error: None }
        },
        Ok(Err(e)) => Report {
            name: name.to_string(),
            address: address.to_string(),
            port,
            open: false,
            error: Some(e.to_string()),
        },
        Err(_) => Report {
            name: name.to_string(),
            address: address.to_string(),
            port,
            open: false,
            error: Some("connect timed out".to_string()),
        },
    }
}

/// Runs `check` on `interval` until `cancel` fires, reporting every outcome.
pub async fn start_checking(
    name: String,
    address: String,
    port: u16,
    interval: Duration,
    reporter: impl Reporter,
    cancel: CancellationToken,
) {
    let mut tick = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {
                let report = check(&name, &address, port).await;
                reporter.report(&report);
            },
        }
    }
}
