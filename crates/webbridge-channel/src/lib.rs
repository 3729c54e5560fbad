// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// webbridge-channel: the bridge channel between native code and a web view
// script context. Call correlation, one-shot callbacks, native handlers,
// timeouts and lifecycle forwarding.

pub mod callback;
pub mod channel;
pub mod executor;
pub mod handlers;
pub mod lifecycle;
mod pending;
pub mod timeout;

pub use callback::{PendingReply, ResponseCallback};
pub use channel::{BridgeChannel, CallOptions, CallTimeout, InboundOutcome};
pub use executor::{CallbackExecutor, CallbackQueue, InlineExecutor, QueueExecutor, TokioExecutor};
pub use handlers::{BridgeHandler, Responder};
pub use lifecycle::LifecycleForwarder;
pub use timeout::spawn_timeout_sweeper;
