// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Exercises [`vici_duckling::reconcile::reinitiator::Reinitiator`]'s global
//! single-flight behavior against a fake charon endpoint that only completes
//! an `initiate` after a deliberate delay, so a second status tick observed
//! while the first is still in flight must be skipped rather than queued.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::net::UnixStream;
use vici_duckling::{
    reconcile::{
        reinitiator::Reinitiator,
        status::{ChildSAStatus, IKESAStatus, StatusReceiver},
    },
    vici::{
        model::{ChildSAConf, IKEConf},
        session::Session,
        wire::{OrderedMap, Segment, SegmentKind, Value, read_segment, write_segment},
    },
};

fn missing_child_status(ike: &str, child: &str) -> IKESAStatus {
    IKESAStatus {
        name: ike.to_string(),
        configuration: IKEConf::default(),
        state: None,
        child_sa: vec![ChildSAStatus { name: child.to_string(), configuration: ChildSAConf::default(), state: None }],
    }
}

#[tokio::test]
async fn second_tick_is_skipped_while_first_initiate_is_in_flight() {
    let (client, server) = UnixStream::pair().expect("pair");
    let initiate_count = Arc::new(AtomicUsize::new(0));
    let server_count = Arc::clone(&initiate_count);

    tokio::spawn(async move {
        let mut server = server;
        loop {
            let req = match read_segment(&mut server).await {
                Ok(s) => s,
                Err(_) => return,
            };
            match req.kind {
                SegmentKind::EventRegister | SegmentKind::EventUnregister => {
                    let reply = Segment::named(SegmentKind::EventConfirm, req.name.unwrap_or_default(), Value::Section(OrderedMap::new()));
                    write_segment(&mut server, &reply).await.expect("write confirm");
                },
                SegmentKind::CmdRequest if req.name.as_deref() == Some("initiate") => {
                    server_count.fetch_add(1, Ordering::SeqCst);
                    // Hold the single in-flight slot open long enough for a
                    // second tick to observe the worker as busy.
                    tokio::time::sleep(Duration::from_millis(150)).await;
                    let mut body = OrderedMap::new();
                    body.push("success", Value::Str("yes".to_string()));
                    let reply = Segment::named(SegmentKind::CmdResponse, "initiate", Value::Section(body));
                    write_segment(&mut server, &reply).await.expect("write initiate reply");
                },
                _ => unreachable!("unexpected request {:?}", req.name),
            }
        }
    });

    let session = Session::from_stream(client, Duration::from_secs(5));
    let reinitiator = Reinitiator::spawn(session);

    reinitiator.ike_sa_status(&missing_child_status("ike1", "c1"));
    // Give the worker time to pick up the first request before the second
    // tick arrives, so it observes `State::Initiating` rather than racing it.
    tokio::time::sleep(Duration::from_millis(20)).await;
    reinitiator.ike_sa_status(&missing_child_status("ike1", "c1"));

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(initiate_count.load(Ordering::SeqCst), 1, "the second tick must be skipped, not queued");
}
