// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the view host boundary.

use webbridge_core::error::Result;

/// The component that owns the script context.
///
/// Implementations must not block waiting for the script to run: a host
/// that can only evaluate on its UI thread posts the script there and
/// returns.
pub trait ViewHost: Send + Sync {
    /// Human-readable host name (e.g. "Android WebView").
    fn name(&self) -> &str;

    /// Hand a script to the page for evaluation.
    ///
    /// Returns `BridgeError::HostDetached` once the script context is gone;
    /// any other refusal is `BridgeError::Host`.
    fn evaluate_script(&self, script: &str) -> Result<()>;

    /// Whether the script context is still alive.
    fn is_attached(&self) -> bool;
}

/// Receiver for everything the host pushes towards native code.
pub trait InboundSink: Send + Sync {
    /// A raw string posted by the page: one envelope or a JSON array of them.
    fn deliver(&self, raw: &str);

    /// The script context has been torn down.
    fn detached(&self);
}
