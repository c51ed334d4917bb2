use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw JSON-RPC 2.0 frame, intentionally permissive: `id`/`method`/`params`/
/// `result`/`error` are all optional so a single type can represent requests,
/// responses, and notifications prior to shape validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcFrame {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcFrame {
    pub fn request(id: Value, method: impl Into<String>, params: Option<Value>) -> Self {
        Self { jsonrpc: "2.0".into(), id: Some(id), method: Some(method.into()), params, result: None, error: None }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self { jsonrpc: "2.0".into(), id: None, method: Some(method.into()), params, result: None, error: None }
    }

    pub fn response(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0".into(), id: Some(id), method: None, params: None, result: Some(result), error: None }
    }

    pub fn error_response(id: Option<Value>, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0".into(), id, method: None, params: None, result: None, error: Some(error) }
    }

    pub fn is_request(&self) -> bool {
        self.id.is_some() && self.method.is_some()
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none() && self.method.is_some()
    }

    pub fn is_response(&self) -> bool {
        self.method.is_none() && (self.result.is_some() || self.error.is_some())
    }
}
