// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the webbridge channel.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CallResult;

/// Wire prefix of every native callback id (`native_cb_42`).
pub const CALL_ID_PREFIX: &str = "native_cb_";

/// Identifier of a callback-bearing call, unique within one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallId(pub u64);

impl CallId {
    /// Render the id the way it travels in an envelope's `callbackId`.
    pub fn to_wire(self) -> String {
        format!("{CALL_ID_PREFIX}{}", self.0)
    }

    /// Parse a `responseId` coming back from the script side.
    ///
    /// Returns `None` for anything that was not minted by [`CallId::to_wire`].
    pub fn from_wire(raw: &str) -> Option<Self> {
        let digits = raw.strip_prefix(CALL_ID_PREFIX)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Exact inverse of `to_wire`: `native_cb_01` was never minted.
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// Identifier of one channel instance, used in logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingState {
    /// Registered, message not yet handed to the view host.
    Created,
    /// Message transmitted, waiting for the script side to answer.
    AwaitingResponse,
    /// A response was delivered to the callback.
    Fulfilled,
    /// Retired by the caller.
    Cancelled,
    /// Deadline passed without a response.
    TimedOut,
    /// The channel closed while the call was in flight.
    Closed,
    /// The view host refused the outbound message.
    Undeliverable,
}

impl PendingState {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Created | Self::AwaitingResponse)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: PendingState) -> bool {
        match self {
            Self::Created => next != Self::Created,
            Self::AwaitingResponse => next.is_terminal(),
            _ => false,
        }
    }

    /// The terminal state matching the value handed to a callback.
    pub fn for_outcome(outcome: &CallResult) -> Self {
        use crate::error::CallFailure;
        match outcome {
            Ok(_) => Self::Fulfilled,
            Err(CallFailure::Cancelled) => Self::Cancelled,
            Err(CallFailure::TimedOut { .. }) => Self::TimedOut,
            Err(CallFailure::ChannelClosed) => Self::Closed,
            Err(CallFailure::Undeliverable(_)) => Self::Undeliverable,
        }
    }
}

/// Read-only snapshot of a pending call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingCallInfo {
    pub id: CallId,
    pub state: PendingState,
    /// Script-side handler the call targeted, if any.
    pub handler: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Time left before the call times out; `None` when it has no deadline.
    pub remaining: Option<Duration>,
}

/// Host lifecycle events forwarded to the script side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
}

impl LifecycleEvent {
    /// Name the script-side lifecycle handler receives as its data.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Create => "ON_CREATE",
            Self::Start => "ON_START",
            Self::Resume => "ON_RESUME",
            Self::Pause => "ON_PAUSE",
            Self::Stop => "ON_STOP",
            Self::Destroy => "ON_DESTROY",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "ON_CREATE" => Some(Self::Create),
            "ON_START" => Some(Self::Start),
            "ON_RESUME" => Some(Self::Resume),
            "ON_PAUSE" => Some(Self::Pause),
            "ON_STOP" => Some(Self::Stop),
            "ON_DESTROY" => Some(Self::Destroy),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallFailure;

    #[test]
    fn call_id_wire_form() {
        assert_eq!(CallId(7).to_wire(), "native_cb_7");
        assert_eq!(CallId::from_wire("native_cb_7"), Some(CallId(7)));
    }

    #[test]
    fn foreign_ids_are_rejected() {
        assert_eq!(CallId::from_wire("JAVA_CB_1_1234"), None);
        assert_eq!(CallId::from_wire("native_cb_"), None);
        assert_eq!(CallId::from_wire("native_cb_-1"), None);
        assert_eq!(CallId::from_wire("native_cb_1x"), None);
        assert_eq!(CallId::from_wire(""), None);
    }

    #[test]
    fn padded_ids_are_not_ours() {
        assert_eq!(CallId::from_wire("native_cb_01"), None);
        assert_eq!(CallId::from_wire("native_cb_007"), None);
        assert_eq!(CallId::from_wire("native_cb_0"), Some(CallId(0)));
        assert_eq!(CallId::from_wire("native_cb_10"), Some(CallId(10)));
    }

    #[test]
    fn terminal_states_are_final() {
        for state in [
            PendingState::Fulfilled,
            PendingState::Cancelled,
            PendingState::TimedOut,
            PendingState::Closed,
            PendingState::Undeliverable,
        ] {
            assert!(state.is_terminal());
            assert!(!state.can_transition_to(PendingState::AwaitingResponse));
            assert!(!state.can_transition_to(PendingState::Fulfilled));
        }
    }

    #[test]
    fn awaiting_only_moves_to_terminal() {
        let s = PendingState::AwaitingResponse;
        assert!(s.can_transition_to(PendingState::Fulfilled));
        assert!(s.can_transition_to(PendingState::TimedOut));
        assert!(!s.can_transition_to(PendingState::Created));
        assert!(PendingState::Created.can_transition_to(PendingState::AwaitingResponse));
    }

    #[test]
    fn outcome_maps_to_state() {
        assert_eq!(
            PendingState::for_outcome(&Ok("pong".into())),
            PendingState::Fulfilled
        );
        assert_eq!(
            PendingState::for_outcome(&Err(CallFailure::ChannelClosed)),
            PendingState::Closed
        );
        assert_eq!(
            PendingState::for_outcome(&Err(CallFailure::TimedOut {
                after: Duration::from_secs(1)
            })),
            PendingState::TimedOut
        );
    }

    #[test]
    fn lifecycle_names_round_trip() {
        for event in [
            LifecycleEvent::Create,
            LifecycleEvent::Start,
            LifecycleEvent::Resume,
            LifecycleEvent::Pause,
            LifecycleEvent::Stop,
            LifecycleEvent::Destroy,
        ] {
            assert_eq!(LifecycleEvent::from_wire_name(event.wire_name()), Some(event));
        }
        assert_eq!(LifecycleEvent::from_wire_name("ON_LOW_MEMORY"), None);
    }
}
