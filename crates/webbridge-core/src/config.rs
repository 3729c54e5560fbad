// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Channel settings. Every field has a default, so a config file only needs
/// to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Global JS object that receives native messages.
    pub js_namespace: String,
    /// Default deadline for callback-bearing calls. `None` disables timeouts.
    pub call_timeout_ms: Option<u64>,
    /// How often the timeout sweeper looks for overdue calls.
    pub sweep_interval_ms: u64,
    /// Upper bound on simultaneously pending calls.
    pub max_pending: usize,
    /// Largest accepted outbound payload, in bytes.
    pub max_message_bytes: usize,
    /// Script-side handler that receives lifecycle events.
    pub lifecycle_handler: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            js_namespace: "WebViewJavascriptBridge".into(),
            call_timeout_ms: Some(30_000),
            sweep_interval_ms: 250,
            max_pending: 8192,
            max_message_bytes: 1024 * 1024,
            lifecycle_handler: "lifeCycleHooks".into(),
        }
    }
}

impl BridgeConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_js_identifier_path(&self.js_namespace) {
            return Err(BridgeError::Config(format!(
                "js_namespace {:?} is not a JS identifier path",
                self.js_namespace
            )));
        }
        if self.call_timeout_ms == Some(0) {
            return Err(BridgeError::Config(
                "call_timeout_ms must be positive (use null to disable)".into(),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(BridgeError::Config("sweep_interval_ms must be positive".into()));
        }
        if self.max_pending == 0 {
            return Err(BridgeError::Config("max_pending must be positive".into()));
        }
        if self.max_message_bytes == 0 {
            return Err(BridgeError::Config("max_message_bytes must be positive".into()));
        }
        if self.lifecycle_handler.trim().is_empty() {
            return Err(BridgeError::Config("lifecycle_handler must not be empty".into()));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// `foo`, `window.bridge`, `$app._b2`. The namespace is spliced into
/// generated script, so nothing else is accepted.
fn is_js_identifier_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
                }
                _ => false,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.sweep_interval(), Duration::from_millis(250));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{ "js_namespace": "window.game", "call_timeout_ms": null }"#)
            .unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.js_namespace, "window.game");
        assert_eq!(config.call_timeout(), None);
        assert_eq!(config.max_pending, 8192);
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        let config = BridgeConfig {
            max_pending: 16,
            ..BridgeConfig::default()
        };
        config.persist(&path).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn rejects_bad_namespace() {
        for ns in ["", "bridge;alert(1)", "a..b", "1abc", "window.", "a b"] {
            let config = BridgeConfig {
                js_namespace: ns.into(),
                ..BridgeConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(BridgeError::Config(_))),
                "{ns:?} accepted"
            );
        }
    }

    #[test]
    fn rejects_zero_limits() {
        let zero_timeout = BridgeConfig {
            call_timeout_ms: Some(0),
            ..BridgeConfig::default()
        };
        assert!(zero_timeout.validate().is_err());

        let zero_pending = BridgeConfig {
            max_pending: 0,
            ..BridgeConfig::default()
        };
        assert!(zero_pending.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BridgeConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, BridgeError::Io(_)));
    }
}
