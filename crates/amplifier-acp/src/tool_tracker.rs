//! Async-local "current tool call" context, grounded on
//! `original_source/acp/approval_bridge.py`'s `ContextVar`-backed
//! `ToolCallTracker`. A Python `ContextVar` is per-task state that flows
//! through `await`s without crossing tasks; `tokio::task_local!` is the
//! direct Rust analogue, so that's what this uses instead of a process-global
//! `static` (§5, §9).

use serde_json::Value;

#[derive(Clone, Debug)]
pub struct ToolCallContext {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

tokio::task_local! {
    static CURRENT_TOOL_CALL: std::cell::RefCell<Option<ToolCallContext>>;
}

/// Run `f` with task-local tool-call tracking available. Must wrap the whole
/// prompt-execution future for a session so `track`/`clear`/`get_current`
/// work inside it.
pub async fn scope<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    CURRENT_TOOL_CALL.scope(std::cell::RefCell::new(None), f).await
}

/// Set on `tool:pre`.
pub fn track(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) {
    let ctx = ToolCallContext { call_id: call_id.into(), tool_name: tool_name.into(), arguments };
    let _ = CURRENT_TOOL_CALL.try_with(|slot| *slot.borrow_mut() = Some(ctx));
}

/// Cleared on `tool:post` / `tool:error`.
pub fn clear() {
    let _ = CURRENT_TOOL_CALL.try_with(|slot| *slot.borrow_mut() = None);
}

/// `None` both outside a `scope()` and when no tool call is currently tracked.
pub fn get_current() -> Option<ToolCallContext> {
    CURRENT_TOOL_CALL.try_with(|slot| slot.borrow().clone()).unwrap_or(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn track_and_clear_round_trip_inside_a_scope() {
        scope(async {
            assert!(get_current().is_none());
            track("c1", "bash", json!({"command": "ls"}));
            assert_eq!(get_current().unwrap().call_id, "c1");
            clear();
            assert!(get_current().is_none());
        })
        .await;
    }

    #[tokio::test]
    async fn concurrent_scopes_do_not_see_each_others_tool_call() {
        let a = scope(async {
            track("a", "bash", json!({}));
            tokio::task::yield_now().await;
            get_current().map(|c| c.call_id)
        });
        let b = scope(async {
            track("b", "grep", json!({}));
            tokio::task::yield_now().await;
            get_current().map(|c| c.call_id)
        });
        let (ra, rb) = tokio::join!(a, b);
        assert_eq!(ra, Some("a".to_string()));
        assert_eq!(rb, Some("b".to_string()));
    }

    #[test]
    fn outside_a_scope_get_current_is_none() {
        assert!(get_current().is_none());
    }
}
