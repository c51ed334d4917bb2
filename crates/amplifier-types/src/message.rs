use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in a session's ordered log, matching `messages.jsonl`'s
/// `role` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One line of `messages.jsonl`: `{role, content[], ts}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<Value>,
    pub ts: chrono::DateTime<chrono::Utc>,
}

impl Message {
    pub fn new(role: Role, content: Vec<Value>) -> Self {
        Self { role, content, ts: chrono::Utc::now() }
    }
}
