// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A scripted stand-in for the page on the other side of the stub host.
//
// It reads what the channel dispatched, answers the calls it knows and posts
// the answers back as one batch, the way the script side flushes its queue.

use std::sync::Arc;

use tracing::{debug, info};

use webbridge_channel::{BridgeChannel, InboundOutcome};
use webbridge_core::envelope::{Envelope, EnvelopeKind};
use webbridge_core::error::Result;
use webbridge_host::StubHost;

/// Messages the page receives but never answers.
const SILENT: &[&str] = &["nobody answers", "abandon me"];

pub struct SimulatedPage {
    host: Arc<StubHost>,
    channel: Arc<BridgeChannel>,
    next_callback: u32,
}

impl SimulatedPage {
    pub fn new(host: Arc<StubHost>, channel: Arc<BridgeChannel>) -> Self {
        Self {
            host,
            channel,
            next_callback: 1,
        }
    }

    /// Process everything dispatched since the last pump.
    ///
    /// Returns the replies native handlers sent to page-initiated requests.
    pub fn pump(&self) -> Result<Vec<Envelope>> {
        let mut answers = Vec::new();
        let mut replies = Vec::new();

        for env in self.host.take_envelopes()? {
            match env.kind() {
                EnvelopeKind::Response { .. } => replies.push(env),
                EnvelopeKind::Request {
                    callback_id,
                    handler,
                    data,
                } => {
                    let data = data.unwrap_or_default();
                    debug!(?handler, data, "page received message");
                    let Some(callback_id) = callback_id else {
                        continue;
                    };
                    if SILENT.contains(&data) {
                        continue;
                    }
                    let answer = match (handler, data) {
                        (Some("getScore"), _) => "42".to_string(),
                        (_, "ping") => "pong".to_string(),
                        (_, other) => format!("echo:{other}"),
                    };
                    answers.push(Envelope::reply(callback_id, &answer));
                }
            }
        }

        if !answers.is_empty() {
            let batch = serde_json::to_string(&answers)?;
            let outcomes = self.channel.handle_inbound(&batch)?;
            let delivered = outcomes
                .iter()
                .filter(|o| matches!(o, InboundOutcome::Delivered(_)))
                .count();
            info!(answered = answers.len(), delivered, "page flushed replies");
        }
        Ok(replies)
    }

    /// Post a page-initiated request to a native handler.
    pub fn call_native(&mut self, handler: &str, data: &str) -> Result<Vec<InboundOutcome>> {
        let env = Envelope {
            data: Some(data.to_owned()),
            callback_id: Some(format!("cb_{}", self.next_callback)),
            handler_name: Some(handler.to_owned()),
            ..Envelope::default()
        };
        self.next_callback += 1;
        self.channel.handle_inbound(&env.to_json()?)
    }
}
