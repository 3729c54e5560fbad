// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// webbridge-core: core types, wire envelope and error definitions shared across
// all crates.

pub mod config;
pub mod envelope;
pub mod error;
pub mod types;

pub use config::BridgeConfig;
pub use envelope::{Envelope, EnvelopeKind};
pub use error::{BridgeError, CallFailure, CallResult};
pub use types::*;
