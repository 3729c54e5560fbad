// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for webbridge.
//
// Two families exist. `BridgeError` is returned synchronously to whoever
// called into the bridge. `CallFailure` is never returned from a call: it is
// handed to a pending call's callback when the call ends without a response.

use std::time::Duration;

use thiserror::Error;

use crate::types::CallId;

/// Top-level error type for synchronous bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    // -- Caller errors --
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("channel is closed")]
    ChannelClosed,

    #[error("too many pending calls (limit {limit})")]
    TooManyPending { limit: usize },

    #[error("no pending call with id {0}")]
    UnknownCall(CallId),

    // -- View host --
    #[error("script context is detached from the view host")]
    HostDetached,

    #[error("view host error: {0}")]
    Host(String),

    // -- Wire / configuration --
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Why a pending call ended without a response payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    /// The script context went away before a response arrived.
    #[error("channel closed before a response arrived")]
    ChannelClosed,

    /// The caller retired the call explicitly.
    #[error("call cancelled")]
    Cancelled,

    #[error("no response after {after:?}")]
    TimedOut { after: Duration },

    /// The view host refused to transmit the message.
    #[error("message could not be delivered: {0}")]
    Undeliverable(String),
}

/// What a response callback receives: the response string or the reason
/// there is none.
pub type CallResult = std::result::Result<String, CallFailure>;
