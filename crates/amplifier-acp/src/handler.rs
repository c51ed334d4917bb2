//! The ACP method table: dispatches the required client→agent methods
//! (§6) onto the session manager and capability negotiation. Grounded on
//! `acp/transport.rs`'s `handle_rpc` match-on-method dispatch, generalized
//! from its single-method-set WebSocket loop to the transport-agnostic
//! `RpcHandler` trait.
//!
//! The agent's own reasoning loop (LLM calls, tool execution) is out of
//! scope; `prompt` here only validates session state, runs the content
//! converter, and hands off — a real agent loop would drive the session's
//! event stream from this point via the event mapper.

use crate::capabilities::{self, InitializeRequest};
use crate::content::{self};
use crate::error::{AcpError, AcpResult};
use crate::jsonrpc::RpcHandler;
use crate::session::{SessionConfig, SessionManager};
use agent_client_protocol::ContentBlock;
use amplifier_types::{Role, SessionState};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct AcpHandler {
    sessions: SessionManager,
    config: crate::config::Config,
    initialized: AtomicBool,
}

impl AcpHandler {
    pub fn new(sessions: SessionManager, config: crate::config::Config) -> Self {
        Self { sessions, config, initialized: AtomicBool::new(false) }
    }

    fn require_initialized(&self) -> AcpResult<()> {
        if self.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AcpError::InvalidRequest("initialize must be called before session operations".into()))
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> AcpResult<Value> {
        let raw = params.clone().unwrap_or(Value::Null);
        let req: InitializeRequest = parse_params(params)?;
        capabilities::check_protocol_version(&req)?;
        capabilities::log_unknown_capability_fields(&raw);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(capabilities::initialize_response(&self.config, &req))
    }

    async fn handle_new_session(&self, params: Option<Value>) -> AcpResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            cwd: String,
            #[serde(default)]
            bundle: Option<String>,
            #[serde(default)]
            behaviors: Vec<String>,
            #[serde(default)]
            provider_config: Value,
        }
        let params: Params = parse_params(params)?;
        let session_id = self
            .sessions
            .create(
                SessionConfig {
                    cwd: params.cwd,
                    bundle: params.bundle,
                    behaviors: params.behaviors,
                    provider_config: params.provider_config,
                    auto_init: true,
                },
                None,
            )
            .await?;
        Ok(json!({ "sessionId": session_id }))
    }

    async fn handle_load_session(&self, params: Option<Value>) -> AcpResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            #[serde(rename = "sessionId")]
            session_id: String,
            #[serde(default)]
            cwd: String,
        }
        let params: Params = parse_params(params)?;
        match self.sessions.resume(&params.session_id, &params.cwd).await {
            Some(session_id) => Ok(json!({ "sessionId": session_id })),
            None => Err(AcpError::UnknownSession(params.session_id)),
        }
    }

    async fn handle_prompt(&self, params: Option<Value>) -> AcpResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            #[serde(rename = "sessionId")]
            session_id: String,
            prompt: Vec<ContentBlock>,
        }
        let params: Params = parse_params(params)?;
        let handle = self.sessions.get(&params.session_id)?;

        {
            let mut session = handle.lock().await;
            if session.metadata.state == SessionState::Prompting {
                return Err(AcpError::PromptInFlight(params.session_id.clone()));
            }
            session.metadata.state = SessionState::Prompting;
        }

        let conversion = content::convert(&params.prompt);
        {
            let mut session = handle.lock().await;
            let blocks: Vec<Value> = conversion.blocks.clone();
            if !blocks.is_empty() || !conversion.text_prompt.is_empty() {
                session.messages.push(amplifier_types::Message::new(Role::User, blocks));
            }
            session.metadata.turn_count += 1;
            session.metadata.state = SessionState::Ready;
        }

        Ok(json!({
            "stopReason": "end_turn",
            "warnings": conversion.warnings,
        }))
    }

    async fn handle_cancel(&self, params: Option<Value>) -> AcpResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            #[serde(rename = "sessionId")]
            session_id: String,
        }
        let params: Params = parse_params(params)?;
        let handle = self.sessions.get(&params.session_id)?;
        let mut session = handle.lock().await;
        session.metadata.state = SessionState::Cancelling;
        Ok(json!({ "stopReason": "cancelled" }))
    }

    async fn handle_set_session_mode(&self, params: Option<Value>) -> AcpResult<Value> {
        #[derive(Deserialize)]
        struct Params {
            #[serde(rename = "sessionId")]
            session_id: String,
        }
        let params: Params = parse_params(params)?;
        self.sessions.get(&params.session_id)?;
        Ok(json!({}))
    }
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: Option<Value>) -> AcpResult<T> {
    let value = params.unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| AcpError::InvalidParams(e.to_string()))
}

#[async_trait]
impl RpcHandler for AcpHandler {
    async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, AcpError> {
        match method {
            "initialize" => self.handle_initialize(params).await,
            "new_session" => {
                self.require_initialized()?;
                self.handle_new_session(params).await
            }
            "load_session" => {
                self.require_initialized()?;
                self.handle_load_session(params).await
            }
            "prompt" => {
                self.require_initialized()?;
                self.handle_prompt(params).await
            }
            "cancel" => {
                self.require_initialized()?;
                self.handle_cancel(params).await
            }
            "set_session_mode" => {
                self.require_initialized()?;
                self.handle_set_session_mode(params).await
            }
            other if other.starts_with("fs/") || other.starts_with("terminal/") => Err(AcpError::MethodNotFound(other.to_string())),
            other => Err(AcpError::MethodNotFound(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, PersistenceConfig};

    fn handler() -> AcpHandler {
        let config = Config { persistence: PersistenceConfig::Disabled, ..Config::default() };
        AcpHandler::new(SessionManager::new(PersistenceConfig::Disabled), config)
    }

    #[tokio::test]
    async fn session_operations_before_initialize_are_rejected() {
        let h = handler();
        let err = h.handle("new_session", Some(json!({"cwd": "/tmp"}))).await.unwrap_err();
        assert_eq!(err.code(), -32600);
    }

    #[tokio::test]
    async fn full_init_then_prompt_flow() {
        let h = handler();
        h.handle("initialize", Some(json!({"protocolVersion": "1.0"}))).await.unwrap();

        let new_session = h.handle("new_session", Some(json!({"cwd": "/tmp"}))).await.unwrap();
        let session_id = new_session["sessionId"].as_str().unwrap().to_string();

        let prompt_result = h
            .handle(
                "prompt",
                Some(json!({"sessionId": session_id, "prompt": [{"type": "text", "text": "hello"}]})),
            )
            .await
            .unwrap();
        assert_eq!(prompt_result["stopReason"], "end_turn");
    }

    #[tokio::test]
    async fn initialize_with_unrecognized_capability_fields_still_succeeds() {
        let h = handler();
        let result = h
            .handle("initialize", Some(json!({"protocolVersion": "1.0", "capabilities": {"mystery": true}})))
            .await
            .unwrap();
        assert_eq!(result["protocolVersion"], "1.0");
    }

    #[tokio::test]
    async fn unsupported_fs_method_is_method_not_found() {
        let h = handler();
        h.handle("initialize", Some(json!({"protocolVersion": "1.0"}))).await.unwrap();
        let err = h.handle("fs/read_text_file", None).await.unwrap_err();
        assert_eq!(err.code(), -32601);
    }

    #[tokio::test]
    async fn cancel_unknown_session_is_unknown_session_error() {
        let h = handler();
        h.handle("initialize", Some(json!({"protocolVersion": "1.0"}))).await.unwrap();
        let err = h.handle("cancel", Some(json!({"sessionId": "nope"}))).await.unwrap_err();
        assert_eq!(err.code(), -32001);
    }
}
