// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The bridge channel.
//
// Native code sends string messages to the page, optionally with a one-shot
// callback. Callback-bearing sends get a `CallId` that travels in the
// envelope's `callbackId`; the page echoes it back as `responseId` and the
// channel routes the response to the matching pending call.
//
// Every pending call ends exactly once: with its response, or with
// `Cancelled`, `TimedOut`, `ChannelClosed` or `Undeliverable`. Responses for
// ids that are no longer pending are logged and dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use webbridge_core::config::BridgeConfig;
use webbridge_core::envelope::{self, Envelope, EnvelopeKind};
use webbridge_core::error::{BridgeError, CallFailure, CallResult, Result};
use webbridge_core::types::{CallId, ChannelId, PendingCallInfo, PendingState};
use webbridge_host::traits::{InboundSink, ViewHost};

use crate::callback::{self, PendingReply, ResponseCallback};
use crate::executor::{CallbackExecutor, InlineExecutor};
use crate::handlers::{BridgeHandler, HandlerRegistry, Responder};
use crate::pending::{PendingCall, PendingTable};

/// Per-call deadline policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallTimeout {
    /// Use `BridgeConfig::call_timeout_ms`.
    #[default]
    Default,
    After(Duration),
    Never,
}

/// Options for a callback-bearing send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub timeout: CallTimeout,
    /// Script-side handler to invoke instead of the page's default handler.
    pub handler: Option<String>,
}

impl CallOptions {
    pub fn handler(name: impl Into<String>) -> Self {
        Self {
            handler: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: CallTimeout) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What became of one inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A response reached its pending call.
    Delivered(CallId),
    /// A response for an id that is unknown or already resolved; ignored.
    DuplicateResponse(String),
    /// A page request was handed to a native handler.
    Dispatched { handler: Option<String> },
    /// A page request found no handler (or the channel is closed).
    Unhandled { handler: Option<String> },
    /// A batch entry that is not an envelope; skipped.
    Malformed(String),
}

/// State shared with responders.
pub(crate) struct Shared {
    pub(crate) id: ChannelId,
    pub(crate) host: Arc<dyn ViewHost>,
    pub(crate) namespace: String,
    pub(crate) pending: PendingTable,
}

impl Shared {
    /// Wrap `envelope` in a dispatch script and hand it to the host.
    pub(crate) fn transmit(&self, envelope: &Envelope) -> Result<()> {
        let script = envelope::dispatch_script(&self.namespace, envelope)?;
        self.host.evaluate_script(&script)
    }
}

/// The bridge between native callers and one page's script context.
///
/// `Send + Sync`; share it as `Arc<BridgeChannel>`. No method blocks on the
/// page.
pub struct BridgeChannel {
    shared: Arc<Shared>,
    handlers: HandlerRegistry,
    executor: Arc<dyn CallbackExecutor>,
    config: BridgeConfig,
}

impl BridgeChannel {
    /// Create a channel over `host`. Callbacks run inline on whichever thread
    /// resolves them until [`BridgeChannel::with_executor`] says otherwise.
    pub fn new(host: Arc<dyn ViewHost>, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let id = ChannelId::new();
        info!(channel = %id, host = host.name(), "bridge channel opened");
        Ok(Self {
            shared: Arc::new(Shared {
                id,
                host,
                namespace: config.js_namespace.clone(),
                pending: PendingTable::new(config.max_pending),
            }),
            handlers: HandlerRegistry::default(),
            executor: Arc::new(InlineExecutor),
            config,
        })
    }

    /// Run callbacks and page-request handlers on `executor`.
    pub fn with_executor(mut self, executor: Arc<dyn CallbackExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn id(&self) -> ChannelId {
        self.shared.id
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.shared.pending.is_closed()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Snapshot of every in-flight call, oldest first.
    pub fn pending_calls(&self) -> Vec<PendingCallInfo> {
        self.shared.pending.snapshot(Instant::now())
    }

    // -- Outbound ------------------------------------------------------------

    /// Fire-and-forget. Nothing is registered and no outcome is observable;
    /// only validation and a closed channel are reported.
    pub fn send(&self, message: &str) -> Result<()> {
        self.send_uncorrelated(None, message)
    }

    /// Fire-and-forget to a named script-side handler.
    pub fn call_handler(&self, handler: &str, data: &str) -> Result<()> {
        validate_handler_name(handler)?;
        self.send_uncorrelated(Some(handler), data)
    }

    /// Send `message` and invoke `on_response` exactly once with the page's
    /// answer or with the failure that ended the call.
    pub fn send_with_callback(
        &self,
        message: &str,
        on_response: impl FnOnce(CallResult) + Send + 'static,
    ) -> Result<CallId> {
        self.send_with_options(message, CallOptions::default(), on_response)
    }

    /// Callback-bearing call to a named script-side handler.
    pub fn call_handler_with_callback(
        &self,
        handler: &str,
        data: &str,
        on_response: impl FnOnce(CallResult) + Send + 'static,
    ) -> Result<CallId> {
        self.send_with_options(data, CallOptions::handler(handler), on_response)
    }

    /// Awaitable form of [`BridgeChannel::send_with_callback`].
    pub fn request(&self, message: &str) -> Result<PendingReply> {
        self.request_with_options(message, CallOptions::default())
    }

    pub fn request_with_options(&self, message: &str, options: CallOptions) -> Result<PendingReply> {
        let (rx, callback) = callback::reply_pair();
        let id = self.register_and_transmit(message, options, callback)?;
        Ok(PendingReply::new(id, rx))
    }

    /// The general callback-bearing send.
    ///
    /// Synchronous errors (invalid message, closed channel, too many pending
    /// calls) are returned and the callback is dropped uninvoked. Once an id
    /// has been returned the callback is guaranteed to run, including when
    /// the host fails to transmit the message.
    pub fn send_with_options(
        &self,
        message: &str,
        options: CallOptions,
        on_response: impl FnOnce(CallResult) + Send + 'static,
    ) -> Result<CallId> {
        self.register_and_transmit(message, options, ResponseCallback::new(on_response))
    }

    #[instrument(skip_all, fields(channel = %self.shared.id, bytes = message.len(), handler = ?options.handler))]
    fn register_and_transmit(
        &self,
        message: &str,
        options: CallOptions,
        callback: ResponseCallback,
    ) -> Result<CallId> {
        self.validate_message(message)?;
        if let Some(handler) = options.handler.as_deref() {
            validate_handler_name(handler)?;
        }
        let timeout = match options.timeout {
            CallTimeout::Default => self.config.call_timeout(),
            CallTimeout::After(t) => Some(t),
            CallTimeout::Never => None,
        };

        let id = self
            .shared
            .pending
            .register(callback, options.handler.clone(), timeout)?;
        let envelope = Envelope::request(message, Some(id), options.handler.as_deref());

        match self.shared.transmit(&envelope) {
            Ok(()) => {
                self.shared.pending.mark_awaiting(id);
                debug!(call_id = %id, "call transmitted");
            }
            Err(e) => {
                let detached = matches!(e, BridgeError::HostDetached);
                warn!(call_id = %id, error = %e, "host refused call");
                if let Some(call) = self.shared.pending.take(id) {
                    let failure = if detached {
                        CallFailure::ChannelClosed
                    } else {
                        CallFailure::Undeliverable(e.to_string())
                    };
                    self.resolve(id, call, Err(failure));
                }
                if detached {
                    self.close();
                }
            }
        }
        Ok(id)
    }

    #[instrument(skip_all, fields(channel = %self.shared.id, bytes = message.len(), handler = ?handler))]
    fn send_uncorrelated(&self, handler: Option<&str>, message: &str) -> Result<()> {
        self.validate_message(message)?;
        if self.is_closed() {
            return Err(BridgeError::ChannelClosed);
        }
        match self.shared.transmit(&Envelope::request(message, None, handler)) {
            Ok(()) => {}
            Err(BridgeError::HostDetached) => {
                warn!("host detached; fire-and-forget message dropped");
                self.close();
            }
            Err(e) => warn!(error = %e, "fire-and-forget message dropped by host"),
        }
        Ok(())
    }

    // -- Ending calls --------------------------------------------------------

    /// Retire a pending call; its callback receives `Cancelled`.
    pub fn cancel(&self, id: CallId) -> Result<()> {
        let call = self
            .shared
            .pending
            .take(id)
            .ok_or(BridgeError::UnknownCall(id))?;
        self.resolve(id, call, Err(CallFailure::Cancelled));
        Ok(())
    }

    /// Close the channel. Every pending call receives `ChannelClosed`;
    /// later sends fail with `ChannelClosed`. Idempotent.
    pub fn close(&self) {
        let Some(drained) = self.shared.pending.close() else {
            return;
        };
        info!(channel = %self.shared.id, pending = drained.len(), "bridge channel closed");
        for (id, call) in drained {
            self.resolve(id, call, Err(CallFailure::ChannelClosed));
        }
    }

    /// Time out every call whose deadline has passed. Returns how many.
    pub fn expire_overdue(&self) -> usize {
        self.expire_overdue_at(Instant::now())
    }

    /// [`BridgeChannel::expire_overdue`] against an explicit clock reading.
    pub fn expire_overdue_at(&self, now: Instant) -> usize {
        let expired = self.shared.pending.take_expired(now);
        let count = expired.len();
        for (id, call) in expired {
            let after = call.timeout.unwrap_or_default();
            warn!(call_id = %id, ?after, "pending call timed out");
            self.resolve(id, call, Err(CallFailure::TimedOut { after }));
        }
        count
    }

    fn resolve(&self, id: CallId, call: PendingCall, outcome: CallResult) {
        let next = PendingState::for_outcome(&outcome);
        debug_assert!(call.state.can_transition_to(next));
        debug!(
            call_id = %id,
            from = ?call.state,
            to = ?next,
            age_ms = (chrono::Utc::now() - call.created_at).num_milliseconds(),
            "pending call resolved"
        );
        let callback = call.callback;
        self.executor.execute(Box::new(move || callback.invoke(outcome)));
    }

    // -- Inbound -------------------------------------------------------------

    /// Route a raw string posted by the page.
    ///
    /// Only input that is not a JSON object or array is an error. Unknown
    /// response ids, unhandled requests and bad entries inside a batch are
    /// reported as outcomes, and the rest of the batch is still routed.
    #[instrument(skip_all, fields(channel = %self.shared.id, bytes = raw.len()))]
    pub fn handle_inbound(&self, raw: &str) -> Result<Vec<InboundOutcome>> {
        let entries = envelope::decode_inbound(raw)?;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                Ok(env) => self.route(&env),
                Err(e) => {
                    warn!(error = %e, "skipping malformed batch entry");
                    InboundOutcome::Malformed(e.to_string())
                }
            })
            .collect())
    }

    fn route(&self, env: &Envelope) -> InboundOutcome {
        match env.kind() {
            EnvelopeKind::Response { response_id, data } => {
                let taken = CallId::from_wire(response_id)
                    .and_then(|id| self.shared.pending.take(id).map(|call| (id, call)));
                match taken {
                    Some((id, call)) => {
                        self.resolve(id, call, Ok(data.unwrap_or_default().to_owned()));
                        InboundOutcome::Delivered(id)
                    }
                    None => {
                        warn!(response_id, "response for unknown or already-resolved call ignored");
                        InboundOutcome::DuplicateResponse(response_id.to_owned())
                    }
                }
            }
            EnvelopeKind::Request {
                callback_id,
                handler,
                data,
            } => {
                let handler_name = handler.map(str::to_owned);
                if self.is_closed() {
                    debug!(handler = ?handler_name, "page request after close ignored");
                    return InboundOutcome::Unhandled { handler: handler_name };
                }
                let Some(target) = self.handlers.resolve(handler) else {
                    warn!(handler = ?handler_name, "no native handler for page request");
                    return InboundOutcome::Unhandled { handler: handler_name };
                };
                let responder = Responder::new(
                    Arc::clone(&self.shared),
                    callback_id.map(str::to_owned),
                    handler_name.clone(),
                );
                let data = data.unwrap_or_default().to_owned();
                self.executor
                    .execute(Box::new(move || target.handle(data, responder)));
                InboundOutcome::Dispatched { handler: handler_name }
            }
        }
    }

    // -- Handlers ------------------------------------------------------------

    /// Serve page requests naming `name`. Replaces any previous handler.
    pub fn register_handler(
        &self,
        name: &str,
        handler: impl BridgeHandler + 'static,
    ) -> Result<()> {
        validate_handler_name(name)?;
        if self.handlers.register(name.to_owned(), Arc::new(handler)) {
            debug!(handler = name, "native handler replaced");
        }
        Ok(())
    }

    pub fn unregister_handler(&self, name: &str) -> bool {
        self.handlers.unregister(name)
    }

    /// Serve page requests that name no handler, or an unregistered one.
    pub fn set_default_handler(&self, handler: impl BridgeHandler + 'static) {
        self.handlers.set_default(Some(Arc::new(handler)));
    }

    pub fn clear_default_handler(&self) {
        self.handlers.set_default(None);
    }

    fn validate_message(&self, message: &str) -> Result<()> {
        if message.len() > self.config.max_message_bytes {
            return Err(BridgeError::InvalidMessage(format!(
                "{} bytes exceeds the {} byte limit",
                message.len(),
                self.config.max_message_bytes
            )));
        }
        Ok(())
    }
}

impl InboundSink for BridgeChannel {
    fn deliver(&self, raw: &str) {
        if let Err(e) = self.handle_inbound(raw) {
            warn!(channel = %self.shared.id, error = %e, "dropping unparseable page message");
        }
    }

    fn detached(&self) {
        self.close();
    }
}

impl Drop for BridgeChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BridgeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeChannel")
            .field("id", &self.shared.id)
            .field("host", &self.shared.host.name())
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn validate_handler_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BridgeError::InvalidMessage("handler name is empty".into()));
    }
    Ok(())
}
