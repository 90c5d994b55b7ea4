//! VICI protocol client: wire codec, session multiplexing, and the typed
//! command layer built on top of it.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Typed command layer (`version`, `list-conns`, `initiate`, ...).
pub mod api;
/// Error taxonomy shared by the client and typed layer.
pub mod error;
/// Decoded IKE/child SA configuration and runtime state.
pub mod model;
/// Multiplexed client session over a Unix domain socket.
pub mod session;
/// Framed message codec: segment framing and the element byte-stream.
pub mod wire;
