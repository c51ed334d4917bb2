//! A keyed subscriber list with priority ordering, per §9's design note:
//! "Hook bus (`emit(event, data)`) is a keyed subscriber list; the spawn
//! forwarder is one registered handler per event name with a priority
//! ordering (lower runs earlier)."

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

type Handler = Box<dyn Fn(&Value) + Send + Sync>;

struct Subscription {
    priority: i32,
    name: String,
    handler: Handler,
}

#[derive(Default)]
pub struct HookBus {
    subscribers: RwLock<HashMap<String, Vec<Subscription>>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, event: impl Into<String>, name: impl Into<String>, priority: i32, handler: impl Fn(&Value) + Send + Sync + 'static) {
        let event = event.into();
        let mut subscribers = self.subscribers.write().unwrap();
        let list = subscribers.entry(event).or_default();
        list.push(Subscription { priority, name: name.into(), handler: Box::new(handler) });
        list.sort_by_key(|s| s.priority);
    }

    pub fn emit(&self, event: &str, data: &Value) {
        let subscribers = self.subscribers.read().unwrap();
        if let Some(list) = subscribers.get(event) {
            for sub in list {
                (sub.handler)(data);
            }
        }
    }

    pub fn subscriber_names(&self, event: &str) -> Vec<String> {
        self.subscribers.read().unwrap().get(event).map(|l| l.iter().map(|s| s.name.clone()).collect()).unwrap_or_default()
    }
}
