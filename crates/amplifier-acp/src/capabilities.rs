//! `initialize` handshake: protocol version negotiation and the
//! `_meta.amplifier` capability block. Grounded on `acp/translator.rs`'s
//! `JsonRpcTranslator` (`negotiate_caps`, `initialize_response_typed`,
//! `ignore_unknown_caps`), adapted from the teacher's `agent.harbor`
//! namespace to `amplifier` and from single-agent metadata to the
//! transport/persistence facts this runtime actually has.

use crate::config::{Config, TransportMode};
use crate::error::AcpError;
use agent_client_protocol::{AgentCapabilities, McpCapabilities, PromptCapabilities};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;

pub const SUPPORTED_PROTOCOL_VERSION: &str = "1.0";

/// Minimal `initialize` request shape. Parsed independently of the full SDK
/// request type so an unrecognized extra field never breaks parsing.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct InitializeRequest {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: Option<String>,
    #[serde(rename = "_meta", default)]
    pub meta: Option<Value>,
}

/// Client must send its protocol version first; any mismatch is fatal
/// per §6, returned as `-32602`.
pub fn check_protocol_version(req: &InitializeRequest) -> Result<(), AcpError> {
    match &req.protocol_version {
        Some(v) if v == SUPPORTED_PROTOCOL_VERSION => Ok(()),
        Some(other) => Err(AcpError::ProtocolVersionMismatch(format!(
            "protocol version mismatch: client requested {other}, server supports {SUPPORTED_PROTOCOL_VERSION}"
        ))),
        None => Err(AcpError::ProtocolVersionMismatch("protocol version mismatch: client did not send a protocol version".into())),
    }
}

pub fn negotiate_caps(config: &Config) -> AgentCapabilities {
    AgentCapabilities {
        load_session: true,
        prompt_capabilities: PromptCapabilities { image: true, audio: false, embedded_context: true, meta: None },
        mcp_capabilities: McpCapabilities { http: config.transport == TransportMode::Http, sse: config.transport != TransportMode::Stdio, meta: None },
        meta: Some(amplifier_meta_caps(config)),
    }
}

fn amplifier_meta_caps(config: &Config) -> Value {
    json!({
        "amplifier": {
            "transport": transport_name(config.transport),
            "persistence": config.persistence.storage_dir().is_some(),
            "spawn": { "version": 1, "supportsDelegation": true },
        }
    })
}

fn transport_name(mode: TransportMode) -> &'static str {
    match mode {
        TransportMode::Stdio => "stdio",
        TransportMode::Http => "http",
        TransportMode::Websocket => "websocket",
    }
}

pub fn initialize_response(config: &Config, req: &InitializeRequest) -> Value {
    let caps = negotiate_caps(config);
    json!({
        "protocolVersion": SUPPORTED_PROTOCOL_VERSION,
        "agentInfo": {
            "name": "amplifier-acp",
            "title": "Amplifier",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "agentCapabilities": {
            "loadSession": caps.load_session,
            "promptCapabilities": caps.prompt_capabilities,
            "mcp": caps.mcp_capabilities,
            "_meta": caps.meta,
        },
        "_requestMeta": req.meta,
    })
}

/// Warn (never fail) on capability fields the client sent that this runtime
/// doesn't recognize, so older/newer clients stay forward-compatible.
pub fn log_unknown_capability_fields(raw: &Value) {
    if let Some(map) = raw.pointer("/capabilities").and_then(|v| v.as_object()) {
        warn_on_unknown(map, &["loadSession", "promptCapabilities", "mcp", "_meta"], "capabilities");
        if let Some(prompt) = map.get("promptCapabilities").and_then(|v| v.as_object()) {
            warn_on_unknown(prompt, &["image", "audio", "embeddedContext", "meta"], "capabilities.promptCapabilities");
        }
        if let Some(mcp) = map.get("mcp").and_then(|v| v.as_object()) {
            warn_on_unknown(mcp, &["http", "sse", "meta"], "capabilities.mcp");
        }
    }
}

fn warn_on_unknown(map: &Map<String, Value>, known: &[&str], context: &str) {
    for key in map.keys() {
        if !known.contains(&key.as_str()) {
            warn!(%context, %key, "unknown capability field ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_protocol_version_is_accepted() {
        let req = InitializeRequest { protocol_version: Some(SUPPORTED_PROTOCOL_VERSION.to_string()), meta: None };
        assert!(check_protocol_version(&req).is_ok());
    }

    #[test]
    fn missing_or_mismatched_version_is_a_protocol_error() {
        let missing = InitializeRequest::default();
        let err = check_protocol_version(&missing).unwrap_err();
        assert_eq!(err.code(), -32602);

        let mismatched = InitializeRequest { protocol_version: Some("0.1".into()), meta: None };
        assert_eq!(check_protocol_version(&mismatched).unwrap_err().code(), -32602);
    }

    #[test]
    fn initialize_response_carries_amplifier_meta_block() {
        let config = Config::default();
        let req = InitializeRequest { protocol_version: Some(SUPPORTED_PROTOCOL_VERSION.to_string()), meta: None };
        let response = initialize_response(&config, &req);
        assert_eq!(response["protocolVersion"], SUPPORTED_PROTOCOL_VERSION);
        assert!(response["agentCapabilities"]["_meta"]["amplifier"]["spawn"]["supportsDelegation"].as_bool().unwrap());
    }

    #[test]
    fn unknown_capability_fields_do_not_panic() {
        let noisy = json!({"capabilities": {"loadSession": true, "mystery": 1}});
        log_unknown_capability_fields(&noisy);
    }
}
