// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background timeout sweeper.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::channel::BridgeChannel;

/// Periodically time out overdue calls on `channel`.
///
/// The task holds only a weak reference, so it never keeps the channel
/// alive. It exits once the channel is dropped or closed. Must be called
/// from within a tokio runtime.
pub fn spawn_timeout_sweeper(channel: &Arc<BridgeChannel>, period: Duration) -> JoinHandle<()> {
    let weak: Weak<BridgeChannel> = Arc::downgrade(channel);
    let channel_id = channel.id();
    // A zero period would make `interval` panic.
    let period = period.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(channel = %channel_id, ?period, "timeout sweeper started");

        loop {
            ticker.tick().await;
            let Some(channel) = weak.upgrade() else {
                break;
            };
            if channel.is_closed() {
                break;
            }
            let expired = channel.expire_overdue();
            if expired > 0 {
                trace!(channel = %channel_id, expired, "sweep expired calls");
            }
        }

        debug!(channel = %channel_id, "timeout sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use webbridge_core::config::BridgeConfig;
    use webbridge_core::error::{CallFailure, CallResult};
    use webbridge_host::StubHost;

    use crate::channel::{CallOptions, CallTimeout};

    fn channel() -> Arc<BridgeChannel> {
        let host = Arc::new(StubHost::new("WebViewJavascriptBridge"));
        Arc::new(BridgeChannel::new(host, BridgeConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn sweeper_times_out_unanswered_call() {
        let channel = channel();
        let sweeper = spawn_timeout_sweeper(&channel, Duration::from_millis(5));

        let reply = channel
            .request_with_options(
                "ping",
                CallOptions::default().with_timeout(CallTimeout::After(Duration::from_millis(20))),
            )
            .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), reply.recv())
            .await
            .expect("sweeper should have fired");
        assert_eq!(
            outcome,
            Err(CallFailure::TimedOut {
                after: Duration::from_millis(20)
            })
        );
        assert_eq!(channel.pending_count(), 0);

        channel.close();
        tokio::time::timeout(Duration::from_secs(5), sweeper)
            .await
            .expect("sweeper should stop after close")
            .unwrap();
    }

    #[tokio::test]
    async fn sweeper_leaves_calls_without_deadline() {
        let channel = channel();
        let _sweeper = spawn_timeout_sweeper(&channel, Duration::from_millis(5));
        let seen: Arc<Mutex<Vec<CallResult>>> = Arc::default();
        let s = Arc::clone(&seen);
        channel
            .send_with_options(
                "ping",
                CallOptions::default().with_timeout(CallTimeout::Never),
                move |outcome| s.lock().unwrap().push(outcome),
            )
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(channel.pending_count(), 1);
    }

    #[tokio::test]
    async fn sweeper_stops_when_channel_dropped() {
        let channel = channel();
        let sweeper = spawn_timeout_sweeper(&channel, Duration::from_millis(5));
        drop(channel);
        tokio::time::timeout(Duration::from_secs(5), sweeper)
            .await
            .expect("sweeper should stop after drop")
            .unwrap();
    }
}
