//! Transport adapters sharing one `Processor` + `RpcHandler` pair across
//! stdio, HTTP, and WebSocket (§4.2). Each adapter only owns framing and the
//! connection lifecycle; dispatch is identical everywhere.

pub mod http;
pub mod stdio;
pub mod ws;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;

const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;

/// Per-session broadcast channel for outbound `session_update` notifications.
/// HTTP's SSE endpoint and the WebSocket adapter both subscribe here; stdio
/// writes frames directly to stdout as they're produced and never touches this.
#[derive(Default)]
pub struct NotificationHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Value>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<Value> {
        let mut channels = self.channels.write().unwrap();
        channels.entry(session_id.to_string()).or_insert_with(|| broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY).0).subscribe()
    }

    /// No-op if nobody has subscribed to `session_id` yet; notifications are
    /// not buffered for late subscribers.
    pub fn publish(&self, session_id: &str, notification: Value) {
        let channels = self.channels.read().unwrap();
        if let Some(sender) = channels.get(session_id) {
            let _ = sender.send(notification);
        }
    }

    pub fn close(&self, session_id: &str) {
        self.channels.write().unwrap().remove(session_id);
    }
}
