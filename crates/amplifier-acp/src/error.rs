use amplifier_types::JsonRpcError;
use thiserror::Error;

/// Errors raised anywhere in the processor/session/transport stack.
///
/// `to_jsonrpc` is the single canonical conversion point into wire-level
/// error objects (§7 of the behavioral spec): every variant maps to exactly
/// one JSON-RPC code, mirroring how the teacher's `ServerError` maps to one
/// `ProblemDetails` shape per variant.
#[derive(Debug, Error)]
pub enum AcpError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("session {0} already has a prompt in flight")]
    PromptInFlight(String),

    #[error("protocol version mismatch: {0}")]
    ProtocolVersionMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl AcpError {
    pub fn code(&self) -> i64 {
        match self {
            Self::Parse(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) | Self::ProtocolVersionMismatch(_) => -32602,
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => -32603,
            // Domain errors get a range outside the JSON-RPC reserved band.
            Self::UnknownSession(_) => -32001,
            Self::PromptInFlight(_) => -32002,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MethodNotFound(_) => "method_not_found",
            Self::InvalidParams(_) => "invalid_params",
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => "internal_error",
            Self::UnknownSession(_) => "unknown_session",
            Self::PromptInFlight(_) => "prompt_in_flight",
            Self::ProtocolVersionMismatch(_) => "protocol_version_mismatch",
        }
    }

    pub fn to_jsonrpc(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data: Some(serde_json::json!({ "kind": self.kind() })),
        }
    }
}

pub type AcpResult<T> = Result<T, AcpError>;
