// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-shot response callbacks.

use tokio::sync::oneshot;

use webbridge_core::error::{CallFailure, CallResult};
use webbridge_core::types::CallId;

/// Callback attached to a pending call.
///
/// Wraps an `FnOnce`: [`ResponseCallback::invoke`] consumes it, so a call
/// can never be answered twice.
pub struct ResponseCallback(Box<dyn FnOnce(CallResult) + Send + 'static>);

impl ResponseCallback {
    pub fn new(f: impl FnOnce(CallResult) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn invoke(self, outcome: CallResult) {
        (self.0)(outcome)
    }
}

impl std::fmt::Debug for ResponseCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResponseCallback")
    }
}

/// Handle returned by [`crate::BridgeChannel::request`] for callers that
/// prefer awaiting over callbacks.
#[derive(Debug)]
pub struct PendingReply {
    id: CallId,
    rx: oneshot::Receiver<CallResult>,
}

impl PendingReply {
    pub(crate) fn new(id: CallId, rx: oneshot::Receiver<CallResult>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    /// Wait for the response or the failure that ended the call.
    pub async fn recv(self) -> CallResult {
        // The sender only disappears without a value if the executor threw the
        // callback away, which only happens when the channel is shutting down.
        self.rx.await.unwrap_or(Err(CallFailure::ChannelClosed))
    }

    /// Non-blocking poll; `None` while the call is still in flight.
    pub fn try_recv(&mut self) -> Option<CallResult> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(CallFailure::ChannelClosed)),
        }
    }
}

/// A callback that forwards its outcome into a oneshot receiver.
pub(crate) fn reply_pair() -> (oneshot::Receiver<CallResult>, ResponseCallback) {
    let (tx, rx) = oneshot::channel();
    let callback = ResponseCallback::new(move |outcome| {
        // The caller may have stopped waiting; nothing to do then.
        let _ = tx.send(outcome);
    });
    (rx, callback)
}
