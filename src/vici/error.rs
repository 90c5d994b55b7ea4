// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Error taxonomy for the VICI client and typed API layer.
///
/// `Timeout` poisons the owning session (see [`crate::vici::session::Session::close`]);
/// every other variant is returned to the caller without further session
/// side effects.
#[derive(Debug, Error, Clone)]
pub enum ViciError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("encoding error: value too long ({0} bytes)")]
    EncodingTooLong(usize),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("frame truncated")]
    Truncated,

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("initiate failed: {0}")]
    InitiateFailed(String),

    #[error("event already registered")]
    AlreadyRegistered,

    #[error("decode error: {0}")]
    Decode(String),

    #[error("session closed")]
    Closed,
}
