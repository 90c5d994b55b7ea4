//! Peer heartbeat: a lightweight HTTP "whoop" exchange used to measure
//! round-trip latency and clock drift against a configured peer.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod whoop;
pub mod whooper;

pub use whoop::{Whoop, WhoopRemoteStatus};
pub use whooper::Whooper;
