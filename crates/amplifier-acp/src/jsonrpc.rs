//! Transport-independent JSON-RPC 2.0 dispatch.
//!
//! A `Processor` wraps one `RpcHandler` and turns inbound frame text into
//! outbound frame text, applying the request/notification/response shape
//! rules once so stdio, HTTP, and WebSocket adapters don't each reimplement
//! them (generalized from the teacher's WebSocket-only `handle_rpc`).

use crate::codec::{decode_frame, encode_frame};
use crate::error::AcpError;
use amplifier_types::JsonRpcFrame;
use async_trait::async_trait;
use serde_json::Value;

/// Implemented by whatever owns the ACP method table (the session engine).
/// `handle` is only ever called for frames shaped as requests or
/// notifications; the processor itself rejects malformed frames before this
/// is reached.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, AcpError>;
}

#[derive(Default)]
pub struct Processor;

impl Processor {
    pub fn new() -> Self {
        Self
    }

    /// Process one inbound line. Returns `Some(line)` when a response frame
    /// must be written back (requests, and synthesized parse/shape errors);
    /// `None` for notifications, which never produce a response.
    pub async fn process_line(&self, handler: &dyn RpcHandler, line: &str) -> Option<String> {
        let frame = match decode_frame(line) {
            Ok(frame) => frame,
            Err(err) => return Some(self.render_error(None, err)),
        };

        if let Err(err) = validate_shape(&frame) {
            return Some(self.render_error(frame.id.clone(), err));
        }

        if frame.is_notification() {
            // Fire-and-forget: handler errors are swallowed per the notification contract.
            let method = frame.method.clone().unwrap_or_default();
            if let Err(err) = handler.handle(&method, frame.params.clone()).await {
                tracing::debug!(%method, error = %err, "notification handler failed");
            }
            return None;
        }

        // Request: id and method both present per validate_shape.
        let id = frame.id.clone().unwrap();
        let method = frame.method.clone().unwrap();
        match handler.handle(&method, frame.params.clone()).await {
            Ok(result) => Some(self.render(JsonRpcFrame::response(id, result))),
            Err(err) => Some(self.render_error(Some(id), err)),
        }
    }

    fn render(&self, frame: JsonRpcFrame) -> String {
        encode_frame(&frame).unwrap_or_else(|_| {
            // Serialization of our own response should never fail; if it
            // somehow does, fall back to a minimal, always-valid frame.
            r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"internal error"}}"#.to_string()
        })
    }

    fn render_error(&self, id: Option<Value>, err: AcpError) -> String {
        self.render(JsonRpcFrame::error_response(id, err.to_jsonrpc()))
    }
}

fn validate_shape(frame: &JsonRpcFrame) -> Result<(), AcpError> {
    if frame.jsonrpc != "2.0" {
        return Err(AcpError::InvalidRequest("jsonrpc version must be \"2.0\"".into()));
    }
    let has_method = frame.method.is_some();
    let has_result_or_error = frame.result.is_some() || frame.error.is_some();
    if !has_method && !has_result_or_error {
        return Err(AcpError::InvalidRequest("frame has neither method nor result/error".into()));
    }
    if has_method && has_result_or_error {
        return Err(AcpError::InvalidRequest("frame cannot carry both a method and a result/error".into()));
    }
    Ok(())
}
