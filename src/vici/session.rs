// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A single multiplexed VICI connection: one dedicated read loop routing
//! `CMD_RESPONSE`/`EVENT_CONFIRM` segments to the in-flight request and
//! `EVENT` segments to registered handlers.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::{
    io::{ReadHalf, WriteHalf, split},
    net::UnixStream,
    sync::{Mutex, mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::vici::{
    error::ViciError,
    wire::{OrderedMap, Segment, SegmentKind, Value, read_segment, write_segment},
};

/// Default read timeout for a request/response round trip (spec default).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Event channel capacity. `list-conns`/`list-sas` can stream one event per
/// connection/SA in a single reply, so this needs headroom well past typical
/// deployment sizes rather than just the handful of lifecycle events a
/// connection produces per second.
const EVENT_CHANNEL_CAPACITY: usize = 4096;

type ResponseSlot = Mutex<Option<oneshot::Sender<Segment>>>;

/// A live VICI session over a Unix domain socket.
pub struct Session {
    reader: Mutex<ReadHalf<UnixStream>>,
    writer: Mutex<WriteHalf<UnixStream>>,
    request_lock: Mutex<()>,
    response_slot: ResponseSlot,
    event_handlers: DashMap<String, mpsc::Sender<Value>>,
    cancel: CancellationToken,
    read_timeout: Duration,
}

impl Session {
    /// Connects to the VICI socket at `path` and spawns the read loop.
    pub async fn connect(path: &str, read_timeout: Duration) -> Result<Arc<Self>, ViciError> {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| ViciError::Transport(e.to_string()))?;
        let (r, w) = split(stream);

        let session = Arc::new(Self {
            reader: Mutex::new(r),
            writer: Mutex::new(w),
            request_lock: Mutex::new(()),
            response_slot: Mutex::new(None),
            event_handlers: DashMap::new(),
            cancel: CancellationToken::new(),
            read_timeout,
        });

        let reader = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(e) = reader.read_loop().await {
                debug!("vici read loop exited: {e}");
            }
        });

        Ok(session)
    }

    /// For tests: wrap an already-connected pair (e.g. `UnixStream::pair`).
    pub fn from_stream(stream: UnixStream, read_timeout: Duration) -> Arc<Self> {
        let (r, w) = split(stream);
        let session = Arc::new(Self {
            reader: Mutex::new(r),
            writer: Mutex::new(w),
            request_lock: Mutex::new(()),
            response_slot: Mutex::new(None),
            event_handlers: DashMap::new(),
            cancel: CancellationToken::new(),
            read_timeout,
        });
        let reader = Arc::clone(&session);
        tokio::spawn(async move {
            if let Err(e) = reader.read_loop().await {
                debug!("vici read loop exited: {e}");
            }
        });
        session
    }

    async fn read_loop(self: Arc<Self>) -> Result<(), ViciError> {
        loop {
            let segment = {
                let mut r = self.reader.lock().await;
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    res = read_segment(&mut *r) => res,
                }
            };

            let segment = match segment {
                Ok(s) => s,
                Err(e) => {
                    self.fail_pending(e.clone());
                    self.cancel.cancel();
                    return Err(e);
                },
            };

            match segment.kind {
                SegmentKind::CmdResponse | SegmentKind::EventConfirm => {
                    let mut slot = self.response_slot.lock().await;
                    if let Some(tx) = slot.take() {
                        let _ = tx.send(segment);
                    } else {
                        warn!("vici: unsolicited response segment with no waiter");
                    }
                },
                SegmentKind::Event => {
                    if let Some(name) = &segment.name
                        && let Some(handler) = self.event_handlers.get(name)
                        && let Err(e) = handler.try_send(segment.body)
                    {
                        warn!("vici: dropping event {name:?}, channel full or closed: {e}");
                    }
                },
                other => {
                    let err = ViciError::Protocol(format!("unexpected segment kind {other:?}"));
                    self.fail_pending(err.clone());
                    self.cancel.cancel();
                    return Err(err);
                },
            }
        }
    }

    fn fail_pending(&self, _err: ViciError) {
        if let Ok(mut slot) = self.response_slot.try_lock() {
            slot.take();
        }
    }

    /// Issues a command request and waits for its response body.
    pub async fn request(&self, api: &str, payload: OrderedMap) -> Result<Value, ViciError> {
        if self.cancel.is_cancelled() {
            return Err(ViciError::Closed);
        }

        let _guard = self.request_lock.lock().await;

        let (tx, rx) = oneshot::channel();
        {
            let mut slot = self.response_slot.lock().await;
            *slot = Some(tx);
        }

        let segment = Segment::named(SegmentKind::CmdRequest, api, Value::Section(payload));
        if let Err(e) = write_segment(&mut *self.writer.lock().await, &segment).await {
            self.response_slot.lock().await.take();
            return Err(e);
        }

        let reply = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ViciError::Closed),
            res = timeout(self.read_timeout, rx) => res,
        };

        let segment = match reply {
            Ok(Ok(seg)) => seg,
            Ok(Err(_)) => return Err(ViciError::Closed),
            Err(_) => {
                // Poison the session: a caller that observed a timeout can no
                // longer trust response ordering on this connection.
                self.cancel.cancel();
                return Err(ViciError::Timeout);
            },
        };

        match segment.kind {
            SegmentKind::CmdResponse => Ok(segment.body),
            other => Err(ViciError::Protocol(format!("expected CMD_RESPONSE, got {other:?}"))),
        }
    }

    /// Registers an event stream, returning a channel of decoded event
    /// bodies. Installs the handler before sending REGISTER so no event
    /// delivered during the round trip is lost.
    pub async fn register_event(
        &self,
        name: &str,
    ) -> Result<mpsc::Receiver<Value>, ViciError> {
        if self.event_handlers.contains_key(name) {
            return Err(ViciError::AlreadyRegistered);
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.event_handlers.insert(name.to_string(), tx);

        if let Err(e) = self.send_event_control(SegmentKind::EventRegister, name).await {
            self.event_handlers.remove(name);
            return Err(e);
        }

        Ok(rx)
    }

    /// Unregisters a previously-registered event stream.
    pub async fn unregister_event(&self, name: &str) -> Result<(), ViciError> {
        self.send_event_control(SegmentKind::EventUnregister, name).await?;
        self.event_handlers.remove(name);
        Ok(())
    }

    async fn send_event_control(&self, kind: SegmentKind, name: &str) -> Result<(), ViciError> {
        if self.cancel.is_cancelled() {
            return Err(ViciError::Closed);
        }

        let _guard = self.request_lock.lock().await;

        let (tx, rx) = oneshot::channel();
        {
            let mut slot = self.response_slot.lock().await;
            *slot = Some(tx);
        }

        let segment = Segment::named(kind, name, Value::Section(OrderedMap::new()));
        if let Err(e) = write_segment(&mut *self.writer.lock().await, &segment).await {
            self.response_slot.lock().await.take();
            return Err(e);
        }

        let reply = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ViciError::Closed),
            res = timeout(self.read_timeout, rx) => res,
        };

        let segment = match reply {
            Ok(Ok(seg)) => seg,
            Ok(Err(_)) => return Err(ViciError::Closed),
            Err(_) => {
                self.cancel.cancel();
                return Err(ViciError::Timeout);
            },
        };

        match segment.kind {
            SegmentKind::EventConfirm => Ok(()),
            other => Err(ViciError::Protocol(format!("expected EVENT_CONFIRM, got {other:?}"))),
        }
    }

    /// Unblocks every in-flight `request`/`register_event` call and stops the
    /// read loop. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
