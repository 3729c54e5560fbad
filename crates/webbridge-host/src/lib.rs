// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! webbridge-host: view host abstractions.
//!
//! A view host owns the script execution context (a WebView on Android).
//! The channel only ever talks to it through [`traits::ViewHost`] and is fed
//! from it through [`traits::InboundSink`], so the same channel code runs on
//! a device and on desktop/CI.

pub mod stub;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

pub use stub::StubHost;
pub use traits::{InboundSink, ViewHost};
