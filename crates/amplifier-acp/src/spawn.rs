//! Parent→child session delegation with event forwarding. Grounded directly
//! on `original_source/protocols/spawn.py`'s `ServerSpawnManager` (§4.7).

use crate::hooks::HookBus;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const FORWARDED_EVENTS: &[&str] = &["content_block:start", "content_block:delta", "content_block:end", "tool:pre", "tool:post", "tool:error"];
const FORWARDER_PRIORITY: i32 = 50;

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub agent_name: String,
    pub instruction: String,
    pub parent_session_id: String,
    pub parent_tool_call_id: Option<String>,
    pub sub_session_id: Option<String>,
    pub nesting_depth: u32,
}

#[derive(Debug, Clone)]
pub struct SpawnOutcome {
    pub status: String,
    pub session_id: String,
    pub error: Option<String>,
}

/// Abstraction over creating and running a child session. The actual agent
/// execution loop is out of scope; the spawn manager only needs to be able
/// to create a child and drive it to completion.
#[async_trait::async_trait]
pub trait ChildSessionRuntime: Send + Sync {
    async fn create_child(&self, sub_session_id: &str, agent_name: &str, parent_session_id: &str) -> anyhow::Result<()>;
    async fn execute(&self, sub_session_id: &str, instruction: &str) -> anyhow::Result<()>;
    async fn cancel(&self, sub_session_id: &str) -> anyhow::Result<()>;
}

pub struct SpawnManager<R: ChildSessionRuntime> {
    runtime: Arc<R>,
    parent_hooks: Arc<HookBus>,
    active_spawns: Mutex<HashMap<String, SpawnRequest>>,
}

impl<R: ChildSessionRuntime> SpawnManager<R> {
    pub fn new(runtime: Arc<R>, parent_hooks: Arc<HookBus>) -> Self {
        Self { runtime, parent_hooks, active_spawns: Mutex::new(HashMap::new()) }
    }

    fn generate_sub_session_id() -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("sub_{}", &hex[..12])
    }

    pub async fn spawn(&self, mut request: SpawnRequest) -> SpawnOutcome {
        let sub_session_id = request.sub_session_id.clone().unwrap_or_else(Self::generate_sub_session_id);
        request.sub_session_id = Some(sub_session_id.clone());

        self.parent_hooks.emit(
            "session:fork",
            &json!({
                "parent_id": request.parent_session_id,
                "child_id": sub_session_id,
                "parent_tool_call_id": request.parent_tool_call_id,
                "agent": request.agent_name,
            }),
        );

        if let Err(err) = self.runtime.create_child(&sub_session_id, &request.agent_name, &request.parent_session_id).await {
            return self.finish_with_error(&sub_session_id, err.to_string());
        }

        self.register_forwarder(&sub_session_id, request.parent_tool_call_id.clone(), request.agent_name.clone(), request.nesting_depth);
        self.active_spawns.lock().unwrap().insert(sub_session_id.clone(), request.clone());

        let result = self.runtime.execute(&sub_session_id, &request.instruction).await;
        self.active_spawns.lock().unwrap().remove(&sub_session_id);

        match result {
            Ok(()) => {
                self.parent_hooks.emit("session:join", &json!({"session_id": sub_session_id, "status": "success"}));
                SpawnOutcome { status: "success".to_string(), session_id: sub_session_id, error: None }
            }
            Err(err) => self.finish_with_error(&sub_session_id, err.to_string()),
        }
    }

    fn finish_with_error(&self, sub_session_id: &str, error: String) -> SpawnOutcome {
        self.parent_hooks.emit(
            "session:join",
            &json!({"session_id": sub_session_id, "status": "error", "error": error}),
        );
        SpawnOutcome { status: "error".to_string(), session_id: sub_session_id.to_string(), error: Some(error) }
    }

    fn register_forwarder(&self, sub_session_id: &str, parent_tool_call_id: Option<String>, agent_name: String, nesting_depth: u32) {
        let hooks = self.parent_hooks.clone();
        let child_session_id = sub_session_id.to_string();
        for event in FORWARDED_EVENTS {
            let hooks = hooks.clone();
            let child_session_id = child_session_id.clone();
            let parent_tool_call_id = parent_tool_call_id.clone();
            let agent_name = agent_name.clone();
            let event_name = event.to_string();
            let emit_hooks = hooks.clone();
            hooks.on(*event, format!("parent-forward:{event}"), FORWARDER_PRIORITY, move |data: &Value| {
                let mut annotated = data.clone();
                if let Some(obj) = annotated.as_object_mut() {
                    obj.insert("child_session_id".to_string(), json!(child_session_id));
                    obj.insert("parent_tool_call_id".to_string(), json!(parent_tool_call_id));
                    obj.insert("agent_name".to_string(), json!(agent_name));
                    let prior = data.get("nesting_depth").and_then(|v| v.as_u64()).unwrap_or(nesting_depth as u64);
                    obj.insert("nesting_depth".to_string(), json!(prior + 1));
                }
                emit_hooks.emit(&event_name, &annotated);
            });
        }
    }

    pub fn active_spawns(&self) -> Vec<String> {
        self.active_spawns.lock().unwrap().keys().cloned().collect()
    }

    pub async fn cancel_spawn(&self, session_id: &str) -> anyhow::Result<()> {
        if self.active_spawns.lock().unwrap().contains_key(session_id) {
            self.runtime.cancel(session_id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeRuntime {
        fail_execute: bool,
        cancelled: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ChildSessionRuntime for FakeRuntime {
        async fn create_child(&self, _sub_session_id: &str, _agent_name: &str, _parent_session_id: &str) -> anyhow::Result<()> {
            Ok(())
        }
        async fn execute(&self, _sub_session_id: &str, _instruction: &str) -> anyhow::Result<()> {
            if self.fail_execute { anyhow::bail!("boom") } else { Ok(()) }
        }
        async fn cancel(&self, _sub_session_id: &str) -> anyhow::Result<()> {
            self.cancelled.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn request() -> SpawnRequest {
        SpawnRequest {
            agent_name: "researcher".into(),
            instruction: "find bugs".into(),
            parent_session_id: "parent-1".into(),
            parent_tool_call_id: Some("call-1".into()),
            sub_session_id: None,
            nesting_depth: 0,
        }
    }

    #[tokio::test]
    async fn successful_spawn_emits_fork_then_join_success() {
        let hooks = Arc::new(HookBus::new());
        let events: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
        for ev in ["session:fork", "session:join"] {
            let events = events.clone();
            hooks.on(ev, "recorder", 0, move |data: &Value| events.lock().unwrap().push((ev.to_string(), data.clone())));
        }
        let runtime = Arc::new(FakeRuntime { fail_execute: false, cancelled: AtomicBool::new(false) });
        let manager = SpawnManager::new(runtime, hooks);

        let outcome = manager.spawn(request()).await;
        assert_eq!(outcome.status, "success");
        assert!(outcome.session_id.starts_with("sub_"));

        let recorded = events.lock().unwrap();
        assert_eq!(recorded[0].0, "session:fork");
        assert_eq!(recorded[1].0, "session:join");
        assert_eq!(recorded[1].1["status"], "success");
    }

    #[tokio::test]
    async fn failed_execution_emits_join_error_and_returns_error_status() {
        let hooks = Arc::new(HookBus::new());
        let runtime = Arc::new(FakeRuntime { fail_execute: true, cancelled: AtomicBool::new(false) });
        let manager = SpawnManager::new(runtime, hooks);
        let outcome = manager.spawn(request()).await;
        assert_eq!(outcome.status, "error");
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn forwarded_events_get_annotated_with_nesting_depth() {
        let hooks = Arc::new(HookBus::new());
        let runtime = Arc::new(FakeRuntime { fail_execute: false, cancelled: AtomicBool::new(false) });
        let manager = SpawnManager::new(runtime, hooks.clone());
        let outcome = manager.spawn(request()).await;

        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        hooks.on("tool:pre", "test-observer", 100, move |data: &Value| {
            *seen_clone.lock().unwrap() = Some(data.clone());
        });
        hooks.emit("tool:pre", &serde_json::json!({"call_id": "x"}));

        let captured = seen.lock().unwrap().clone().unwrap();
        assert_eq!(captured["child_session_id"], outcome.session_id);
        assert_eq!(captured["nesting_depth"], 1);
    }

    #[tokio::test]
    async fn cancel_spawn_only_cancels_if_still_active() {
        let hooks = Arc::new(HookBus::new());
        let runtime = Arc::new(FakeRuntime { fail_execute: false, cancelled: AtomicBool::new(false) });
        let manager = SpawnManager::new(runtime.clone(), hooks);
        manager.cancel_spawn("not-active").await.unwrap();
        assert!(!runtime.cancelled.load(Ordering::SeqCst));
    }
}
