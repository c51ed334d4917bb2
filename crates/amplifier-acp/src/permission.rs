//! Bridges a tool hook's synchronous "ask user" call into an ACP
//! `session/request_permission` round-trip. Grounded directly on
//! `original_source/acp/approval_bridge.py`'s `ACPApprovalBridge` — the
//! option-kind pattern table, cache key, and default-resolution rules below
//! are a line-for-line port of that module's semantics (§4.5).

use crate::tool_metadata::{tool_kind, tool_title};
use crate::tool_tracker;
use agent_client_protocol::{ContentBlock, TextContent, ToolCallStatus, ToolKind};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    AllowOnce,
    AllowAlways,
    RejectOnce,
    RejectAlways,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultOutcome {
    Allow,
    Deny,
}

/// Ordered longest-pattern-first so e.g. "allow always" is matched before the
/// bare "allow" substring.
fn option_kind_map() -> Vec<(&'static str, OptionKind)> {
    let mut entries = vec![
        ("allow once", OptionKind::AllowOnce),
        ("allow always", OptionKind::AllowAlways),
        ("allow session", OptionKind::AllowAlways),
        ("allow", OptionKind::AllowOnce),
        ("yes", OptionKind::AllowOnce),
        ("deny once", OptionKind::RejectOnce),
        ("deny always", OptionKind::RejectAlways),
        ("deny", OptionKind::RejectOnce),
        ("no", OptionKind::RejectOnce),
        ("reject", OptionKind::RejectOnce),
    ];
    entries.sort_by_key(|(pattern, _)| std::cmp::Reverse(pattern.len()));
    entries
}

#[derive(Clone, Debug)]
pub struct PermissionOption {
    pub option_id: String,
    pub name: String,
    pub kind: OptionKind,
}

#[derive(Clone, Debug)]
pub struct ToolCallRequestContext {
    pub call_id: String,
    pub title: String,
    pub kind: ToolKind,
    pub status: ToolCallStatus,
    pub content: Vec<ContentBlock>,
}

/// Abstraction over whatever transport actually sends
/// `session/request_permission` and awaits the client's reply. Modeled as a
/// trait (not a bare closure) because the real implementation needs session
/// routing state; the "lazy accessor" indirection from §9's design note is
/// captured by `PermissionBridge::get_client` instead.
#[async_trait]
pub trait PermissionClient: Send + Sync {
    async fn request_permission(
        &self,
        session_id: &str,
        tool_call: &ToolCallRequestContext,
        options: &[PermissionOption],
    ) -> anyhow::Result<String>;
}

pub struct PermissionBridge {
    session_id: String,
    cache: Mutex<HashMap<u64, String>>,
    get_client: Box<dyn Fn() -> Option<std::sync::Arc<dyn PermissionClient>> + Send + Sync>,
}

impl PermissionBridge {
    pub fn new(
        session_id: impl Into<String>,
        get_client: impl Fn() -> Option<std::sync::Arc<dyn PermissionClient>> + Send + Sync + 'static,
    ) -> Self {
        Self { session_id: session_id.into(), cache: Mutex::new(HashMap::new()), get_client: Box::new(get_client) }
    }

    pub async fn request_approval(
        &self,
        prompt: &str,
        options: &[String],
        timeout: Duration,
        default: DefaultOutcome,
    ) -> String {
        let cache_key = Self::cache_key(prompt, options);
        if let Some(cached) = self.cache.lock().unwrap().get(&cache_key).cloned() {
            return cached;
        }

        let permission_options = Self::build_permission_options(options);
        let tool_call = Self::build_tool_call_context(prompt);

        let Some(client) = (self.get_client)() else {
            return self.resolve_default(default, options);
        };

        let outcome = tokio::time::timeout(
            timeout,
            client.request_permission(&self.session_id, &tool_call, &permission_options),
        )
        .await;

        let chosen = match outcome {
            Ok(Ok(option_id)) => Self::map_option_id_to_string(&option_id, options),
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "permission request failed, resolving to default");
                self.resolve_default(default, options)
            }
            Err(_) => {
                tracing::warn!(%prompt, "permission request timed out, resolving to default");
                self.resolve_default(default, options)
            }
        };

        if chosen.to_lowercase().contains("always") {
            self.cache.lock().unwrap().insert(cache_key, chosen.clone());
        }

        chosen
    }

    fn cache_key(prompt: &str, options: &[String]) -> u64 {
        let mut hasher = DefaultHasher::new();
        prompt.hash(&mut hasher);
        for opt in options {
            opt.hash(&mut hasher);
        }
        hasher.finish()
    }

    fn build_permission_options(options: &[String]) -> Vec<PermissionOption> {
        let kind_map = option_kind_map();
        options
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let lower = name.to_lowercase();
                let kind = kind_map
                    .iter()
                    .find(|(pattern, _)| lower.contains(pattern))
                    .map(|(_, kind)| *kind)
                    .unwrap_or(OptionKind::AllowOnce);
                PermissionOption { option_id: format!("opt_{i}"), name: name.clone(), kind }
            })
            .collect()
    }

    fn build_tool_call_context(prompt: &str) -> ToolCallRequestContext {
        if let Some(current) = tool_tracker::get_current() {
            let title = tool_title(&current.tool_name, &current.arguments);
            let kind = tool_kind(&current.tool_name);
            return ToolCallRequestContext {
                call_id: current.call_id,
                title,
                kind,
                status: ToolCallStatus::Pending,
                content: vec![ContentBlock::Text(TextContent { annotations: None, text: prompt.to_string(), meta: None })],
            };
        }

        let suffix: String = {
            use std::time::{SystemTime, UNIX_EPOCH};
            let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().subsec_nanos();
            format!("{nanos:08x}")
        };

        ToolCallRequestContext {
            call_id: format!("approval_{suffix}"),
            title: "Permission Required".to_string(),
            kind: ToolKind::Other,
            status: ToolCallStatus::Pending,
            content: vec![ContentBlock::Text(TextContent { annotations: None, text: prompt.to_string(), meta: None })],
        }
    }

    fn map_option_id_to_string(option_id: &str, options: &[String]) -> String {
        let index = option_id.strip_prefix("opt_").and_then(|n| n.parse::<usize>().ok());
        match index.and_then(|i| options.get(i)) {
            Some(opt) => opt.clone(),
            None => {
                tracing::warn!(%option_id, "unmappable option id, falling back to first option");
                options.first().cloned().unwrap_or_default()
            }
        }
    }

    fn resolve_default(&self, default: DefaultOutcome, options: &[String]) -> String {
        let needle: &[&str] = match default {
            DefaultOutcome::Allow => &["allow", "yes"],
            DefaultOutcome::Deny => &["deny", "no"],
        };
        if let Some(found) = options.iter().find(|o| {
            let lower = o.to_lowercase();
            needle.iter().any(|n| lower.contains(n))
        }) {
            return found.clone();
        }
        match default {
            DefaultOutcome::Allow => options.first().cloned().unwrap_or_default(),
            DefaultOutcome::Deny => options.last().cloned().unwrap_or_default(),
        }
    }
}
