// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native handlers for requests initiated by the script side.
//
// A page request names a handler (`handlerName`) or relies on the default
// handler. The handler receives the request data and a `Responder` that can
// answer the page exactly once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace, warn};

use webbridge_core::envelope::Envelope;
use webbridge_core::error::{BridgeError, Result};

use crate::channel::Shared;

/// Serves page requests.
pub trait BridgeHandler: Send + Sync {
    fn handle(&self, data: String, responder: Responder);
}

impl<F> BridgeHandler for F
where
    F: Fn(String, Responder) + Send + Sync,
{
    fn handle(&self, data: String, responder: Responder) {
        self(data, responder)
    }
}

/// One-shot reply path back to the page request that carried a
/// `callbackId`.
pub struct Responder {
    shared: Arc<Shared>,
    callback_id: Option<String>,
    handler: Option<String>,
    answered: bool,
}

impl Responder {
    pub(crate) fn new(
        shared: Arc<Shared>,
        callback_id: Option<String>,
        handler: Option<String>,
    ) -> Self {
        Self {
            shared,
            callback_id,
            handler,
            answered: false,
        }
    }

    /// Whether the page asked for a reply at all.
    pub fn expects_reply(&self) -> bool {
        self.callback_id.is_some()
    }

    /// Send `data` back to the page.
    ///
    /// A no-op when the request carried no `callbackId`. Fails with
    /// `ChannelClosed` once the channel has been closed.
    pub fn respond(mut self, data: &str) -> Result<()> {
        self.answered = true;
        let Some(callback_id) = self.callback_id.as_deref() else {
            trace!(handler = ?self.handler, "page did not ask for a reply");
            return Ok(());
        };
        if self.shared.pending.is_closed() {
            warn!(handler = ?self.handler, "reply after channel close dropped");
            return Err(BridgeError::ChannelClosed);
        }
        self.shared.transmit(&Envelope::reply(callback_id, data))
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if !self.answered && self.callback_id.is_some() {
            debug!(
                handler = ?self.handler,
                callback_id = ?self.callback_id,
                "handler finished without replying to the page"
            );
        }
    }
}

impl std::fmt::Debug for Responder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Responder")
            .field("callback_id", &self.callback_id)
            .field("handler", &self.handler)
            .finish()
    }
}

/// Named handlers plus an optional fallback.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    named: RwLock<HashMap<String, Arc<dyn BridgeHandler>>>,
    default: RwLock<Option<Arc<dyn BridgeHandler>>>,
}

impl HandlerRegistry {
    pub(crate) fn register(&self, name: String, handler: Arc<dyn BridgeHandler>) -> bool {
        write(&self.named).insert(name, handler).is_some()
    }

    pub(crate) fn unregister(&self, name: &str) -> bool {
        write(&self.named).remove(name).is_some()
    }

    pub(crate) fn set_default(&self, handler: Option<Arc<dyn BridgeHandler>>) {
        *write(&self.default) = handler;
    }

    /// Named handler if registered, otherwise the default handler.
    pub(crate) fn resolve(&self, name: Option<&str>) -> Option<Arc<dyn BridgeHandler>> {
        name.and_then(|n| read(&self.named).get(n).cloned())
            .or_else(|| read(&self.default).clone())
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}
