// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use prometheus::Registry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vici_duckling::{
    cfg::{cli::Cli, config::Config, logger::init_logger},
    daemon::Daemon,
    httpd,
    metrics::{daemon::DaemonReporter, ikesa::IkeSaMetrics, tcpchecker::TcpCheckerMetrics},
    reconcile::{reconciler::Reconciler, reinitiator::Reinitiator, status::StatusReceiver},
    tcpchecker::{checker::start_checking, log_reporter::LogReporter, reporter::CompositeReporter},
    vici::{api::monitor::monitor, session::{DEFAULT_READ_TIMEOUT, Session}},
    whooping::Whooper,
};

/// Interval between watchdog `stats` calls while monitoring IKE/child events.
const MONITOR_WATCHDOG: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from(cli);

    let _log_guard = init_logger(&config.log_level, config.log_output, config.log_file.as_deref())
        .context("failed to initialize logger")?;

    let session = Session::connect(&config.vici_socket, DEFAULT_READ_TIMEOUT)
        .await
        .context("failed to connect to the VICI socket")?;
    info!("connected to VICI socket at {}", config.vici_socket);

    let registry = Registry::new();
    let cancel = CancellationToken::new();

    let ike_metrics = IkeSaMetrics::register(&registry).context("failed to register IKE SA metrics")?;

    let mut receivers: Vec<Box<dyn StatusReceiver>> = vec![Box::new(ike_metrics)];
    if config.enable_reinitiator {
        info!("re-initiator enabled");
        receivers.push(Box::new(Reinitiator::spawn(Arc::clone(&session))));
    }
    let reconciler = Arc::new(Reconciler::new(receivers));

    let reconcile_reporter = DaemonReporter::register(&registry, "reconcile").context("failed to register reconcile daemon metrics")?;
    let reconcile_session = Arc::clone(&session);
    let reconcile_reconciler = Arc::clone(&reconciler);
    let reconcile_daemon = Daemon::new(
        config.reconcile_interval,
        move || {
            let session = Arc::clone(&reconcile_session);
            let reconciler = Arc::clone(&reconcile_reconciler);
            async move {
                if let Err(e) = reconciler.collect(&session).await {
                    warn!("reconciliation tick failed: {e}");
                }
            }
        },
        reconcile_reporter,
    );
    let reconcile_handle = tokio::spawn(reconcile_daemon.run(cancel.clone()));

    let monitor_handle = if config.monitor {
        let monitor_session = Arc::clone(&session);
        let monitor_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = monitor_cancel.cancelled() => {},
                res = monitor(&monitor_session, MONITOR_WATCHDOG, |name, body| {
                    tracing::debug!(target: "vici::event", event = name, body = ?body);
                }) => {
                    if let Err(e) = res {
                        warn!("event monitor stopped: {e}");
                    }
                },
            }
        }))
    } else {
        None
    };

    let whooper = Arc::new(Whooper::new(config.listen.clone()));
    let whoop_handle = if let Some(peer) = config.whoop_peer.clone() {
        let whoop_reporter = DaemonReporter::register(&registry, "whoop").context("failed to register whoop daemon metrics")?;
        let whooper = Arc::clone(&whooper);
        let whoop_daemon = Daemon::new(
            config.whoop_interval,
            move || {
                let whooper = Arc::clone(&whooper);
                let peer = peer.clone();
                async move { whooper.whoop(&peer).await }
            },
            whoop_reporter,
        );
        Some(tokio::spawn(whoop_daemon.run(cancel.clone())))
    } else {
        None
    };

    let tcp_metrics = if !config.tcp_checkers.is_empty() {
        Some(Arc::new(TcpCheckerMetrics::register(&registry).context("failed to register TCP checker metrics")?))
    } else {
        None
    };
    let mut tcp_handles = Vec::with_capacity(config.tcp_checkers.len());
    for checker in &config.tcp_checkers {
        let reporter = CompositeReporter::new(vec![
            Box::new(Arc::clone(tcp_metrics.as_ref().expect("tcp metrics registered above"))),
            Box::new(LogReporter::new()),
        ]);
        tcp_handles.push(tokio::spawn(start_checking(
            checker.name.clone(),
            checker.address.clone(),
            checker.port,
            config.tcp_checker_interval,
            reporter,
            cancel.child_token(),
        )));
    }

    let httpd_handle =
        tokio::spawn(httpd::serve(config.listen.clone(), registry, Some(Arc::clone(&whooper)), cancel.clone()));

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    cancel.cancel();
    session.close();

    reconcile_handle.await.context("reconcile daemon task panicked")?;
    if let Some(h) = monitor_handle {
        h.await.context("monitor task panicked")?;
    }
    if let Some(h) = whoop_handle {
        h.await.context("whoop daemon task panicked")?;
    }
    for h in tcp_handles {
        h.await.context("tcp checker task panicked")?;
    }

    match httpd_handle.await.context("httpd task panicked")? {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("httpd server error: {e}");
            Err(e)
        },
    }
}
