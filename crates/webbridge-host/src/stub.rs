// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub host for desktop/CI builds where no real web view exists.
//
// Scripts are recorded instead of evaluated. Tests and the demo binary play
// the page: they read back what was dispatched and feed replies into the
// channel themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use webbridge_core::envelope::{self, Envelope};
use webbridge_core::error::{BridgeError, Result};

use crate::traits::ViewHost;

/// Recording host returned on non-device platforms.
pub struct StubHost {
    namespace: String,
    scripts: Mutex<Vec<String>>,
    attached: AtomicBool,
    fail_next: Mutex<Option<String>>,
}

impl StubHost {
    /// `namespace` must match the channel's `js_namespace` for
    /// [`StubHost::take_envelopes`] to decode what was dispatched.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            scripts: Mutex::new(Vec::new()),
            attached: AtomicBool::new(true),
            fail_next: Mutex::new(None),
        }
    }

    /// Every script evaluated so far, oldest first.
    pub fn scripts(&self) -> Vec<String> {
        lock(&self.scripts).clone()
    }

    /// Drain the recorded scripts and decode them back into envelopes.
    pub fn take_envelopes(&self) -> Result<Vec<Envelope>> {
        let scripts = std::mem::take(&mut *lock(&self.scripts));
        scripts
            .iter()
            .map(|s| envelope::parse_dispatch_script(&self.namespace, s))
            .collect()
    }

    /// Simulate the page being torn down.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        tracing::info!("stub host detached");
    }

    /// Make the next `evaluate_script` fail with `BridgeError::Host`.
    pub fn fail_next(&self, reason: impl Into<String>) {
        *lock(&self.fail_next) = Some(reason.into());
    }
}

impl ViewHost for StubHost {
    fn name(&self) -> &str {
        "Desktop (stub)"
    }

    fn evaluate_script(&self, script: &str) -> Result<()> {
        if !self.is_attached() {
            tracing::warn!("ViewHost::evaluate_script called on detached stub host");
            return Err(BridgeError::HostDetached);
        }
        if let Some(reason) = lock(&self.fail_next).take() {
            return Err(BridgeError::Host(reason));
        }
        tracing::debug!(bytes = script.len(), "stub host recorded script");
        lock(&self.scripts).push(script.to_owned());
        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

/// A panic while holding one of these locks cannot leave the data
/// half-written, so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use webbridge_core::types::CallId;

    #[test]
    fn records_and_decodes_scripts() {
        let host = StubHost::new("bridge");
        let env = Envelope::request("ping", Some(CallId(1)), None);
        host.evaluate_script(&envelope::dispatch_script("bridge", &env).unwrap())
            .unwrap();

        assert_eq!(host.scripts().len(), 1);
        assert_eq!(host.take_envelopes().unwrap(), vec![env]);
        assert!(host.scripts().is_empty());
    }

    #[test]
    fn detached_host_refuses_scripts() {
        let host = StubHost::new("bridge");
        host.detach();
        assert!(!host.is_attached());
        assert!(matches!(
            host.evaluate_script("bridge.x();"),
            Err(BridgeError::HostDetached)
        ));
    }

    #[test]
    fn fail_next_is_one_shot() {
        let host = StubHost::new("bridge");
        host.fail_next("renderer busy");
        assert!(matches!(
            host.evaluate_script("a();"),
            Err(BridgeError::Host(reason)) if reason == "renderer busy"
        ));
        host.evaluate_script("b();").unwrap();
        assert_eq!(host.scripts(), vec!["b();".to_string()]);
    }
}
