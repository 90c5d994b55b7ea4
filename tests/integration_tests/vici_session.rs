// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Exercises [`vici_duckling::vici::session::Session`] against a fake charon
//! endpoint built directly on [`vici_duckling::vici::wire`], over a
//! `UnixStream::pair` rather than a real VICI socket.

use std::time::Duration;

use tokio::net::UnixStream;
use vici_duckling::vici::{
    session::Session,
    wire::{OrderedMap, Segment, SegmentKind, Value, read_segment, write_segment},
};

const TEST_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn request_round_trip_returns_response_body() {
    let (client, server) = UnixStream::pair().expect("pair");

    tokio::spawn(async move {
        let mut server = server;
        let req = read_segment(&mut server).await.expect("read request");
        assert_eq!(req.kind, SegmentKind::CmdRequest);
        assert_eq!(req.name.as_deref(), Some("version"));

        let mut body = OrderedMap::new();
        body.push("daemon", Value::Str("charon".to_string()));
        let reply = Segment::named(SegmentKind::CmdResponse, "version", Value::Section(body));
        write_segment(&mut server, &reply).await.expect("write reply");
    });

    let session = Session::from_stream(client, TEST_TIMEOUT);
    let body = session.request("version", OrderedMap::new()).await.expect("request");

    let section = body.as_section().expect("section body");
    assert_eq!(section.get("daemon").and_then(Value::as_str), Some("charon"));
}

#[tokio::test]
async fn close_unblocks_in_flight_request_within_bounded_time() {
    let (client, server) = UnixStream::pair().expect("pair");
    // Server reads the request and then never replies.
    tokio::spawn(async move {
        let mut server = server;
        let _req = read_segment(&mut server).await.expect("read request");
        std::future::pending::<()>().await;
    });

    let session = Session::from_stream(client, Duration::from_secs(30));
    let request = session.request("version", OrderedMap::new());

    let session_for_close = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session_for_close.close();
    });

    let result = tokio::time::timeout(TEST_TIMEOUT, request)
        .await
        .expect("request should unblock well before the 30s read timeout");
    assert!(result.is_err());
}

#[tokio::test]
async fn duplicate_event_registration_is_rejected() {
    let (client, server) = UnixStream::pair().expect("pair");
    tokio::spawn(async move {
        let mut server = server;
        loop {
            let req = match read_segment(&mut server).await {
                Ok(s) => s,
                Err(_) => return,
            };
            let reply = Segment::named(SegmentKind::EventConfirm, req.name.unwrap_or_default(), Value::Section(OrderedMap::new()));
            write_segment(&mut server, &reply).await.expect("write confirm");
        }
    });

    let session = Session::from_stream(client, TEST_TIMEOUT);
    let _rx = session.register_event("list-sa").await.expect("first register");

    let err = session.register_event("list-sa").await.expect_err("second register must fail");
    assert!(matches!(err, vici_duckling::vici::error::ViciError::AlreadyRegistered));
}
