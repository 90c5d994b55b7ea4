// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Minimal HTTP server exposing `/metrics` (Prometheus text format) and
//! `/whoop` (the peer heartbeat endpoint), built directly on a hyper 1.x
//! accept loop rather than a web framework.

use std::sync::Arc;

use http_body_util::{BodyExt, Empty, Full};
use hyper::{
    Request, Response, StatusCode,
    body::{Bytes, Incoming},
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::whooping::{Whoop, Whooper};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, std::convert::Infallible>;

fn full(body: impl Into<Bytes>) -> BoxBody {
    Full::new(body.into()).map_err(|never| match never {}).boxed()
}

fn empty() -> BoxBody {
    Empty::new().map_err(|never| match never {}).boxed()
}

struct AppState {
    registry: Registry,
    whooper: Option<Arc<Whooper>>,
}

async fn handle(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<BoxBody>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&hyper::Method::GET, "/metrics") => {
            let metric_families = state.registry.gather();
            let mut buf = Vec::new();
            let encoder = TextEncoder::new();
            if let Err(e) = encoder.encode(&metric_families, &mut buf) {
                error!("metrics encode failed: {e}");
                return Ok(Response::builder().status(StatusCode::INTERNAL_SERVER_ERROR).body(empty()).expect("response"));
            }
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("content-type", encoder.format_type())
                .body(full(buf))
                .expect("response"))
        },
        (&hyper::Method::POST, "/whoop") => {
            let Some(whooper) = &state.whooper else {
                return Ok(Response::builder().status(StatusCode::NOT_FOUND).body(empty()).expect("response"));
            };

            let body = match req.into_body().collect().await {
                Ok(b) => b.to_bytes(),
                Err(e) => {
                    warn!("whoop body read failed: {e}");
                    return Ok(Response::builder().status(StatusCode::BAD_REQUEST).body(empty()).expect("response"));
                },
            };
            let incoming: Whoop = match serde_json::from_slice(&body) {
                Ok(w) => w,
                Err(e) => {
                    warn!("whoop body decode failed: {e}");
                    return Ok(Response::builder().status(StatusCode::BAD_REQUEST).body(empty()).expect("response"));
                },
            };

            match whooper.answer(&incoming) {
                Ok(reply) => {
                    let json = serde_json::to_vec(&reply).unwrap_or_default();
                    Ok(Response::builder().status(StatusCode::OK).header("content-type", "application/json").body(full(json)).expect("response"))
                },
                Err(msg) => Ok(Response::builder().status(StatusCode::BAD_REQUEST).body(full(msg)).expect("response")),
            }
        },
        _ => Ok(Response::builder().status(StatusCode::NOT_FOUND).body(empty()).expect("response")),
    }
}

/// Serves `/metrics` and `/whoop` on `listen` until `cancel` fires.
///
/// Takes `listen` by value so the returned future is `'static` and can be
/// handed to `tokio::spawn` without borrowing the caller's config.
pub async fn serve(
    listen: String,
    registry: Registry,
    whooper: Option<Arc<Whooper>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&listen).await?;
    info!("httpd listening on {listen}");

    let state = Arc::new(AppState { registry, whooper });

    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            res = listener.accept() => res?,
        };

        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);
        let conn_cancel = cancel.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, Arc::clone(&state)));
            let conn = hyper::server::conn::http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            tokio::select! {
                _ = conn_cancel.cancelled() => {},
                res = &mut conn => {
                    if let Err(e) = res {
                        warn!("connection from {peer} failed: {e}");
                    }
                },
            }
        });
    }
}
