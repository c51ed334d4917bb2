//! Shared tool name → title/kind lookup, used by both the event mapper and
//! the permission bridge (both need to turn a raw tool name and its
//! arguments into a human-readable title). Grounded on
//! `original_source/acp/tool_metadata.py`.

use agent_client_protocol::ToolKind;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

const TITLE_MAX_LEN: usize = 50;

#[derive(Clone, Copy)]
struct ToolMeta {
    kind: ToolKind,
    title_fn: fn(&Value) -> Option<String>,
}

fn table() -> &'static HashMap<&'static str, ToolMeta> {
    static TABLE: OnceLock<HashMap<&'static str, ToolMeta>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert("bash", ToolMeta { kind: ToolKind::Execute, title_fn: |args| {
            args.get("command").and_then(|v| v.as_str()).map(|c| format!("Run: {}", truncate(c)))
        }});
        m.insert("write_file", ToolMeta { kind: ToolKind::Edit, title_fn: |args| {
            args.get("file_path").and_then(|v| v.as_str()).map(|p| format!("Write to {p}"))
        }});
        m.insert("edit_file", ToolMeta { kind: ToolKind::Edit, title_fn: |args| {
            args.get("file_path").and_then(|v| v.as_str()).map(|p| format!("Edit {p}"))
        }});
        m.insert("read_file", ToolMeta { kind: ToolKind::Read, title_fn: |args| {
            args.get("file_path").and_then(|v| v.as_str()).map(|p| format!("Read {p}"))
        }});
        m.insert("glob", ToolMeta { kind: ToolKind::Search, title_fn: |args| {
            args.get("pattern").and_then(|v| v.as_str()).map(|p| format!("Search files: {p}"))
        }});
        m.insert("grep", ToolMeta { kind: ToolKind::Search, title_fn: |args| {
            args.get("pattern").and_then(|v| v.as_str()).map(|p| format!("Search content: {p}"))
        }});
        m.insert("web_fetch", ToolMeta { kind: ToolKind::Fetch, title_fn: |args| {
            args.get("url").and_then(|v| v.as_str()).map(|u| format!("Fetch URL: {u}"))
        }});
        m.insert("web_search", ToolMeta { kind: ToolKind::Fetch, title_fn: |args| {
            args.get("query").and_then(|v| v.as_str()).map(|q| format!("Search web: {q}"))
        }});
        m.insert("task", ToolMeta { kind: ToolKind::Other, title_fn: |_| None });
        m
    })
}

/// Truncate at `TITLE_MAX_LEN` chars, appending `...` when cut short.
/// Operates on chars, not bytes, so multi-byte UTF-8 is never split.
pub fn truncate(s: &str) -> String {
    if s.chars().count() <= TITLE_MAX_LEN {
        return s.to_string();
    }
    let head: String = s.chars().take(TITLE_MAX_LEN).collect();
    format!("{head}...")
}

/// Human-readable title for a tool call, per the §4.4 title-derivation rule.
/// Unknown tools fall back to their title-cased name.
pub fn tool_title(tool_name: &str, arguments: &Value) -> String {
    if let Some(meta) = table().get(tool_name) {
        if let Some(title) = (meta.title_fn)(arguments) {
            return title;
        }
    }
    title_case(tool_name)
}

/// Kind for a tool call, per the §4.4 kind set. Unknown tools → `other`.
pub fn tool_kind(tool_name: &str) -> ToolKind {
    table().get(tool_name).map(|m| m.kind).unwrap_or(ToolKind::Other)
}

fn title_case(tool_name: &str) -> String {
    tool_name
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
