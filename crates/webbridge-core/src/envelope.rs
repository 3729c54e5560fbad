// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire envelope exchanged with the script side.
//
// Every message crossing the boundary is a JSON object with camelCase keys:
//
//   native -> script   {"data", "callbackId"?, "handlerName"?}
//                      {"responseId", "responseData"}     (reply to a script request)
//   script -> native   {"responseId", "responseData"}     (reply to a native call)
//                      {"data", "callbackId"?, "handlerName"?}
//
// An envelope carrying a non-empty `responseId` is a response; everything
// else is a request. Outbound envelopes are wrapped in a call to
// `<namespace>._handleMessageFromNative(...)` before reaching the view host.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::CallId;

/// Name of the script-side function that receives native envelopes.
pub const DISPATCH_FUNCTION: &str = "_handleMessageFromNative";

/// One message on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub callback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub handler_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
    pub response_data: Option<String>,
}

/// Borrowed view of what an envelope asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind<'a> {
    Response {
        response_id: &'a str,
        data: Option<&'a str>,
    },
    Request {
        callback_id: Option<&'a str>,
        handler: Option<&'a str>,
        data: Option<&'a str>,
    },
}

impl Envelope {
    /// Native request, optionally correlated and optionally aimed at a named
    /// script handler.
    pub fn request(data: &str, callback: Option<CallId>, handler: Option<&str>) -> Self {
        Self {
            data: Some(data.to_owned()),
            callback_id: callback.map(CallId::to_wire),
            handler_name: handler.map(str::to_owned),
            ..Self::default()
        }
    }

    /// Reply to a request that carried `response_id` as its `callbackId`.
    pub fn reply(response_id: &str, data: &str) -> Self {
        Self {
            response_id: Some(response_id.to_owned()),
            response_data: Some(data.to_owned()),
            ..Self::default()
        }
    }

    pub fn kind(&self) -> EnvelopeKind<'_> {
        match non_empty(&self.response_id) {
            Some(response_id) => EnvelopeKind::Response {
                response_id,
                data: self.response_data.as_deref(),
            },
            None => EnvelopeKind::Request {
                callback_id: non_empty(&self.callback_id),
                handler: non_empty(&self.handler_name),
                data: self.data.as_deref(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse a raw inbound string: a single envelope, a JSON array of envelopes
/// (a flushed queue), or nothing at all.
///
/// Only input that is not a JSON object or array fails as a whole. Inside a
/// batch each entry decodes on its own, so one bad entry never hides the
/// envelopes next to it.
pub fn decode_inbound(raw: &str) -> Result<Vec<Result<Envelope>>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| BridgeError::MalformedEnvelope(format!("not JSON: {e}")))?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .map_err(|e| BridgeError::MalformedEnvelope(format!("entry {i}: {e}")))
            })
            .collect()),
        obj @ serde_json::Value::Object(_) => serde_json::from_value(obj)
            .map(|env| vec![Ok(env)])
            .map_err(|e| BridgeError::MalformedEnvelope(e.to_string())),
        other => Err(BridgeError::MalformedEnvelope(format!(
            "expected object or array, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Build the script that hands `envelope` to the page.
pub fn dispatch_script(namespace: &str, envelope: &Envelope) -> Result<String> {
    let json = envelope.to_json()?;
    // A JSON string literal is a JS string literal once the two line
    // separators JSON allows raw are escaped.
    let literal = serde_json::to_string(&json)?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!("{namespace}.{DISPATCH_FUNCTION}({literal});"))
}

/// Inverse of [`dispatch_script`]. Used by hosts that simulate the page.
pub fn parse_dispatch_script(namespace: &str, script: &str) -> Result<Envelope> {
    let literal = script
        .trim()
        .strip_prefix(namespace)
        .and_then(|s| s.strip_prefix('.'))
        .and_then(|s| s.strip_prefix(DISPATCH_FUNCTION))
        .and_then(|s| s.strip_prefix('('))
        .and_then(|s| s.strip_suffix(");"))
        .ok_or_else(|| {
            BridgeError::MalformedEnvelope(format!("not a {namespace} dispatch script"))
        })?;
    let json: String = serde_json::from_str(literal)?;
    Ok(serde_json::from_str(&json)?)
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Pages are not always careful about types: numbers and objects are kept as
/// their JSON text, `null` counts as absent.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
