//! Internal agent events → ACP `SessionUpdate` values. Grounded on
//! `original_source/acp/event_mapper.py`'s dispatch table, translated from a
//! Python dict-of-closures into a Rust match, and on `ah-acp-bridge`'s
//! `SessionUpdate`-construction idiom for the typed output shape.

use crate::tool_metadata::{tool_kind, tool_title};
use agent_client_protocol::{
    ContentBlock, Plan, PlanEntry, PlanEntryPriority, PlanEntryStatus, SessionUpdate, TextContent,
    ToolCall, ToolCallId, ToolCallStatus, ToolCallUpdate, ToolCallUpdateFields,
};
use serde_json::Value;

const IGNORED_PREFIXES: &[&str] =
    &["session:", "execution:", "llm:", "provider:", "prompt:", "orchestrator:"];

/// Side effects the caller must apply to the tool-call tracker. The mapper
/// itself never touches the tracker — it only reports what should happen,
/// keeping it a pure function over `(event_type, payload)`.
#[derive(Debug, Default)]
pub struct EventMapResult {
    pub update: Option<SessionUpdate>,
    pub track_tool: Option<(String, String, Value)>,
    pub clear_tool_tracking: bool,
}

impl EventMapResult {
    fn update(update: SessionUpdate) -> Self {
        Self { update: Some(update), ..Default::default() }
    }

    fn none() -> Self {
        Self::default()
    }
}

pub fn map_event(event_type: &str, payload: &Value) -> EventMapResult {
    if IGNORED_PREFIXES.iter().any(|p| event_type.starts_with(p)) {
        return EventMapResult::none();
    }

    match event_type {
        "content_block:delta" | "content_block:end" => handle_text_delta(payload),
        "content_block:start" => EventMapResult::none(),
        "content" | "assistant_message" | "text" => handle_text_delta(payload),
        "tool:pre" => handle_tool_pre(payload),
        "tool:post" => handle_tool_post(payload),
        "tool:error" => handle_tool_error(payload),
        "todo:update" => handle_todo_update(payload),
        other if other.starts_with("thinking:") => handle_thinking(payload),
        other => {
            tracing::debug!(event_type = other, "unrecognized agent event, ignoring");
            EventMapResult::none()
        }
    }
}

fn payload_text(payload: &Value) -> String {
    payload.get("text").and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

fn agent_message_chunk(text: String) -> SessionUpdate {
    SessionUpdate::AgentMessageChunk { content: ContentBlock::Text(TextContent { annotations: None, text, meta: None }) }
}

fn handle_text_delta(payload: &Value) -> EventMapResult {
    let text = payload_text(payload);
    if text.is_empty() {
        return EventMapResult::none();
    }
    EventMapResult::update(agent_message_chunk(text))
}

fn handle_thinking(payload: &Value) -> EventMapResult {
    let text = payload_text(payload);
    EventMapResult::update(SessionUpdate::AgentThoughtChunk {
        content: ContentBlock::Text(TextContent { annotations: None, text, meta: None }),
    })
}

fn handle_tool_pre(payload: &Value) -> EventMapResult {
    let call_id = payload.get("call_id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let name = payload.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let arguments = payload.get("arguments").cloned().unwrap_or(Value::Null);

    let title = tool_title(&name, &arguments);
    let kind = tool_kind(&name);

    let update = SessionUpdate::ToolCall(ToolCall {
        id: ToolCallId(call_id.clone().into()),
        title,
        kind,
        status: ToolCallStatus::Pending,
        content: Vec::new(),
        locations: Vec::new(),
        raw_input: Some(arguments.clone()),
        raw_output: None,
        meta: None,
    });

    EventMapResult { update: Some(update), track_tool: Some((call_id, name, arguments)), clear_tool_tracking: false }
}

fn handle_tool_post(payload: &Value) -> EventMapResult {
    let call_id = payload.get("call_id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let result = payload.get("result").cloned().unwrap_or(Value::Null);

    let update = SessionUpdate::ToolCallUpdate(ToolCallUpdate {
        id: ToolCallId(call_id.into()),
        fields: ToolCallUpdateFields {
            status: Some(ToolCallStatus::Completed),
            content: None,
            locations: None,
            raw_input: None,
            raw_output: Some(result),
            title: None,
            kind: None,
        },
        meta: None,
    });

    EventMapResult { update: Some(update), track_tool: None, clear_tool_tracking: true }
}

fn handle_tool_error(payload: &Value) -> EventMapResult {
    let call_id = payload.get("call_id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let error_info = payload.get("error").cloned().unwrap_or(Value::Null);

    let update = SessionUpdate::ToolCallUpdate(ToolCallUpdate {
        id: ToolCallId(call_id.into()),
        fields: ToolCallUpdateFields {
            status: Some(ToolCallStatus::Failed),
            content: None,
            locations: None,
            raw_input: None,
            raw_output: Some(serde_json::json!({ "error": error_info })),
            title: None,
            kind: None,
        },
        meta: None,
    });

    EventMapResult { update: Some(update), track_tool: None, clear_tool_tracking: true }
}

fn handle_todo_update(payload: &Value) -> EventMapResult {
    let entries = payload
        .get("entries")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(todo_entry_to_plan_entry)
        .collect();

    EventMapResult::update(SessionUpdate::Plan(Plan { entries, meta: None }))
}

fn todo_entry_to_plan_entry(raw: &Value) -> PlanEntry {
    let content = raw
        .get("content")
        .and_then(|v| v.as_str())
        .or_else(|| raw.get("activeForm").and_then(|v| v.as_str()))
        .unwrap_or("Task")
        .to_string();

    let status = match raw.get("status").and_then(|v| v.as_str()) {
        Some("pending") => PlanEntryStatus::Pending,
        Some("in_progress") => PlanEntryStatus::InProgress,
        Some("completed") => PlanEntryStatus::Completed,
        _ => PlanEntryStatus::Pending,
    };

    let priority = match raw.get("priority").and_then(|v| v.as_str()) {
        Some("high") => PlanEntryPriority::High,
        Some("medium") => PlanEntryPriority::Medium,
        Some("low") => PlanEntryPriority::Low,
        _ => PlanEntryPriority::Medium,
    };

    PlanEntry { content, status, priority, meta: None }
}
