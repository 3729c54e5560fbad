// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The pending-call table.
//
// Every way a call can end (response, cancel, timeout, close, failed
// transmission) goes through a `take*` method that removes the entry under
// the lock. Whoever removes an entry owns its callback, so each callback is
// invoked by exactly one resolver. Callbacks are never invoked here.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use webbridge_core::error::{BridgeError, Result};
use webbridge_core::types::{CallId, PendingCallInfo, PendingState};

use crate::callback::ResponseCallback;

/// A callback-bearing call that has not ended yet.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub(crate) callback: ResponseCallback,
    pub(crate) state: PendingState,
    pub(crate) handler: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) timeout: Option<Duration>,
    deadline: Option<Instant>,
}

#[derive(Debug, Default)]
struct TableState {
    calls: HashMap<CallId, PendingCall>,
    next_id: u64,
    closed: bool,
}

#[derive(Debug)]
pub(crate) struct PendingTable {
    state: Mutex<TableState>,
    limit: usize,
}

impl PendingTable {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            state: Mutex::new(TableState {
                next_id: 1,
                ..TableState::default()
            }),
            limit,
        }
    }

    /// Register a new call in the `Created` state and mint its id.
    ///
    /// Fails once the table is closed, so no call can slip in after
    /// [`PendingTable::close`] has drained the table.
    pub(crate) fn register(
        &self,
        callback: ResponseCallback,
        handler: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<CallId> {
        let mut state = self.lock();
        if state.closed {
            return Err(BridgeError::ChannelClosed);
        }
        if state.calls.len() >= self.limit {
            warn!(
                pending = state.calls.len(),
                limit = self.limit,
                "too many pending calls; refusing new call"
            );
            return Err(BridgeError::TooManyPending { limit: self.limit });
        }

        let id = CallId(state.next_id);
        state.next_id += 1;
        state.calls.insert(
            id,
            PendingCall {
                callback,
                state: PendingState::Created,
                handler,
                created_at: Utc::now(),
                timeout,
                // A timeout too large to represent never fires.
                deadline: timeout.and_then(|t| Instant::now().checked_add(t)),
            },
        );
        debug!(call_id = %id, pending = state.calls.len(), "registered pending call");
        Ok(id)
    }

    /// `Created -> AwaitingResponse` once the host accepted the message.
    /// A no-op if the call already ended.
    pub(crate) fn mark_awaiting(&self, id: CallId) {
        if let Some(call) = self.lock().calls.get_mut(&id) {
            if call.state.can_transition_to(PendingState::AwaitingResponse) {
                call.state = PendingState::AwaitingResponse;
            }
        }
    }

    pub(crate) fn take(&self, id: CallId) -> Option<PendingCall> {
        self.lock().calls.remove(&id)
    }

    /// Remove every call whose deadline is at or before `now`, oldest first.
    pub(crate) fn take_expired(&self, now: Instant) -> Vec<(CallId, PendingCall)> {
        let mut state = self.lock();
        let mut overdue: Vec<CallId> = state
            .calls
            .iter()
            .filter(|(_, call)| call.deadline.is_some_and(|d| d <= now))
            .map(|(id, _)| *id)
            .collect();
        overdue.sort_unstable();
        overdue
            .into_iter()
            .filter_map(|id| state.calls.remove(&id).map(|call| (id, call)))
            .collect()
    }

    /// Close the table and drain it, oldest first.
    ///
    /// Returns `None` if it was already closed.
    pub(crate) fn close(&self) -> Option<Vec<(CallId, PendingCall)>> {
        let mut state = self.lock();
        if state.closed {
            return None;
        }
        state.closed = true;
        let mut drained: Vec<(CallId, PendingCall)> = state.calls.drain().collect();
        drained.sort_unstable_by_key(|(id, _)| *id);
        Some(drained)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().calls.len()
    }

    pub(crate) fn snapshot(&self, now: Instant) -> Vec<PendingCallInfo> {
        let state = self.lock();
        let mut infos: Vec<PendingCallInfo> = state
            .calls
            .iter()
            .map(|(id, call)| PendingCallInfo {
                id: *id,
                state: call.state,
                handler: call.handler.clone(),
                created_at: call.created_at,
                remaining: call.deadline.map(|d| d.saturating_duration_since(now)),
            })
            .collect();
        infos.sort_unstable_by_key(|info| info.id);
        infos
    }

    fn lock(&self) -> MutexGuard<'_, TableState> {
        // Entries are inserted and removed whole; a panic elsewhere cannot
        // leave one half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
