use serde::{Deserialize, Serialize};

/// Lifecycle state of a live session.
///
/// `prompting` and `awaiting_permission` are mutually exclusive with a second
/// `prompt` call on the same session — the session manager enforces this, not
/// this enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Initializing,
    Ready,
    Prompting,
    AwaitingPermission,
    Cancelling,
    Closed,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Initializing
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Prompting => "prompting",
            Self::AwaitingPermission => "awaiting_permission",
            Self::Cancelling => "cancelling",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// `metadata.json` as written under
/// `<home>/.amplifier/projects/<encoded_cwd>/sessions/<session_id>/`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedMetadata {
    pub session_id: String,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created: chrono::DateTime<chrono::Utc>,
    pub updated: chrono::DateTime<chrono::Utc>,
    pub turn_count: u64,
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,
}

impl PersistedMetadata {
    pub fn new(session_id: impl Into<String>, cwd: impl Into<String>, bundle: Option<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            session_id: session_id.into(),
            cwd: cwd.into(),
            name: None,
            created: now,
            updated: now,
            turn_count: 0,
            state: SessionState::Initializing,
            bundle,
            parent_session_id: None,
        }
    }

    /// True iff `parent_session_id` is set, or the id looks like a spawned
    /// sub-session (contains both `_` and `-`). The second test is a
    /// heuristic, kept only for sessions discovered without metadata.
    pub fn is_child(&self) -> bool {
        self.parent_session_id.is_some() || looks_like_child_id(&self.session_id)
    }
}

pub(crate) fn looks_like_child_id(session_id: &str) -> bool {
    session_id.contains('_') && session_id.contains('-')
}

/// Fallback record used when a session directory exists but `metadata.json`
/// is missing or unreadable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinimalSessionRecord {
    pub session_id: String,
    pub cwd: String,
    pub state: String,
    pub turn_count: u64,
    pub is_child: bool,
}

impl MinimalSessionRecord {
    pub fn for_unknown(session_id: impl Into<String>, cwd: impl Into<String>) -> Self {
        let session_id = session_id.into();
        let is_child = looks_like_child_id(&session_id);
        Self { session_id, cwd: cwd.into(), state: "unknown".to_string(), turn_count: 0, is_child }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_detection_prefers_explicit_parent() {
        let mut meta = PersistedMetadata::new("plain-id", "/tmp", None);
        assert!(!meta.is_child());
        meta.parent_session_id = Some("parent-1".into());
        assert!(meta.is_child());
    }

    #[test]
    fn child_detection_falls_back_to_id_heuristic() {
        let meta = PersistedMetadata::new("sub_abc123-def", "/tmp", None);
        assert!(meta.is_child());
    }

    #[test]
    fn minimal_record_marks_unknown_state() {
        let rec = MinimalSessionRecord::for_unknown("sub_123-x", "/tmp/proj");
        assert_eq!(rec.state, "unknown");
        assert!(rec.is_child);
    }
}
