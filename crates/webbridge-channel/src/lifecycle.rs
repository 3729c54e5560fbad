// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Forwards host lifecycle events to the page's lifecycle handler.

use std::sync::Arc;

use tracing::{debug, info};

use webbridge_core::error::{BridgeError, Result};
use webbridge_core::types::LifecycleEvent;

use crate::channel::BridgeChannel;

/// Sends `ON_CREATE` .. `ON_DESTROY` to the script-side handler named by
/// `BridgeConfig::lifecycle_handler`. `Destroy` also closes the channel.
#[derive(Debug, Clone)]
pub struct LifecycleForwarder {
    channel: Arc<BridgeChannel>,
    handler: String,
}

impl LifecycleForwarder {
    pub fn new(channel: Arc<BridgeChannel>) -> Self {
        let handler = channel.config().lifecycle_handler.clone();
        Self { channel, handler }
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    /// Forward `event` as a fire-and-forget call.
    ///
    /// Events arriving after the channel closed are dropped silently; the
    /// host keeps emitting them while it tears the view down.
    pub fn notify(&self, event: LifecycleEvent) -> Result<()> {
        debug!(%event, handler = %self.handler, "forwarding lifecycle event");
        match self.channel.call_handler(&self.handler, event.wire_name()) {
            Ok(()) | Err(BridgeError::ChannelClosed) => {}
            Err(e) => return Err(e),
        }
        if event == LifecycleEvent::Destroy {
            info!(channel = %self.channel.id(), "view destroyed; closing bridge channel");
            self.channel.close();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webbridge_core::config::BridgeConfig;
    use webbridge_core::envelope::Envelope;
    use webbridge_core::error::CallFailure;
    use webbridge_host::StubHost;

    fn setup() -> (Arc<StubHost>, Arc<BridgeChannel>, LifecycleForwarder) {
        let host = Arc::new(StubHost::new("WebViewJavascriptBridge"));
        let channel = Arc::new(BridgeChannel::new(host.clone(), BridgeConfig::default()).unwrap());
        let forwarder = LifecycleForwarder::new(Arc::clone(&channel));
        (host, channel, forwarder)
    }

    #[test]
    fn events_reach_the_lifecycle_handler() {
        let (host, _channel, forwarder) = setup();
        forwarder.notify(LifecycleEvent::Create).unwrap();
        forwarder.notify(LifecycleEvent::Resume).unwrap();

        assert_eq!(forwarder.handler(), "lifeCycleHooks");
        assert_eq!(
            host.take_envelopes().unwrap(),
            vec![
                Envelope::request("ON_CREATE", None, Some("lifeCycleHooks")),
                Envelope::request("ON_RESUME", None, Some("lifeCycleHooks")),
            ]
        );
    }

    #[test]
    fn destroy_closes_the_channel() {
        let (host, channel, forwarder) = setup();
        let reply = channel.request("pending").unwrap();
        host.take_envelopes().unwrap();

        forwarder.notify(LifecycleEvent::Destroy).unwrap();

        assert!(channel.is_closed());
        let sent = host.take_envelopes().unwrap();
        assert_eq!(sent[0].data.as_deref(), Some("ON_DESTROY"));

        let mut reply = reply;
        assert_eq!(reply.try_recv(), Some(Err(CallFailure::ChannelClosed)));
    }

    #[test]
    fn events_after_close_are_dropped() {
        let (host, channel, forwarder) = setup();
        channel.close();
        forwarder.notify(LifecycleEvent::Stop).unwrap();
        forwarder.notify(LifecycleEvent::Destroy).unwrap();
        assert!(host.scripts().is_empty());
    }

    #[test]
    fn custom_handler_name_from_config() {
        let host = Arc::new(StubHost::new("WebViewJavascriptBridge"));
        let config = BridgeConfig {
            lifecycle_handler: "onHostLifecycle".into(),
            ..BridgeConfig::default()
        };
        let channel = Arc::new(BridgeChannel::new(host.clone(), config).unwrap());
        LifecycleForwarder::new(channel)
            .notify(LifecycleEvent::Pause)
            .unwrap();
        assert_eq!(
            host.take_envelopes().unwrap()[0].handler_name.as_deref(),
            Some("onHostLifecycle")
        );
    }
}
