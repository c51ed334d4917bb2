//! Session lifecycle and the set of live sessions. Grounded on
//! `models.rs`'s `SessionStore` trait + `InternalSession` (generalized from
//! the teacher's SQLite-backed store to the spec's JSON-file-per-session
//! layout) and on `original_source/acp/session_discovery.py` for the
//! encode/decode path codec reused here for persistence (§4.6).

use crate::bundle_cache::PreparedBundleCache;
use crate::config::PersistenceConfig;
use crate::discovery::encode_project_path;
use crate::error::{AcpError, AcpResult};
use amplifier_types::{Message, PersistedMetadata, Role, SessionState};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex as AsyncMutex;

/// Fixed bundle `create_minimal` loads: empty behaviors, a cheap provider,
/// never persisted. Fast path for ephemeral scoring/classification calls.
const MINIMAL_BUNDLE: &str = "foundation";

/// A live session: its metadata plus the ordered message log. Execution
/// state and the notification sink live on whatever owns the prompt loop
/// (out of scope here — the agent's own reasoning loop); the session only
/// tracks what the protocol plane needs to answer `session/*` calls.
pub struct Session {
    pub metadata: PersistedMetadata,
    pub messages: Vec<Message>,
    pub prepared_bundle: Option<Arc<str>>,
}

impl Session {
    fn new(session_id: String, cwd: String, bundle: Option<String>) -> Self {
        Self { metadata: PersistedMetadata::new(session_id, cwd, bundle), messages: Vec::new(), prepared_bundle: None }
    }
}

pub struct SessionConfig {
    pub cwd: String,
    pub bundle: Option<String>,
    pub behaviors: Vec<String>,
    pub provider_config: Value,
    pub auto_init: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { cwd: ".".to_string(), bundle: None, behaviors: Vec::new(), provider_config: Value::Null, auto_init: true }
    }
}

/// Owns the set of live sessions and, when persistence is enabled, writes
/// `metadata.json` + appends to `messages.jsonl` for each one.
pub struct SessionManager {
    active: RwLock<HashMap<String, Arc<AsyncMutex<Session>>>>,
    persistence: PersistenceConfig,
    bundle_cache: PreparedBundleCache<Arc<str>>,
}

impl SessionManager {
    pub fn new(persistence: PersistenceConfig) -> Self {
        Self { active: RwLock::new(HashMap::new()), persistence, bundle_cache: PreparedBundleCache::new() }
    }

    /// Resolve (preparing on a cache miss) the handle for `bundle` under
    /// `(behaviors, provider_config)`. Bundle preparation itself is out of
    /// scope (module discovery, recipe parsing) so the "prepared" value is
    /// just the bundle name wrapped for cheap cloning; what matters here is
    /// that repeat calls with the same key never re-run `prepare`.
    fn resolve_bundle(&self, bundle: &str, behaviors: &[String], provider_config: &Value) -> Arc<str> {
        let owned = bundle.to_string();
        self.bundle_cache.get_or_prepare(bundle, behaviors, provider_config, || Arc::<str>::from(owned.as_str()))
    }

    fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn session_dir(&self, cwd: &str, session_id: &str) -> Option<PathBuf> {
        self.persistence.storage_dir().map(|root| root.join(encode_project_path(cwd)).join("sessions").join(session_id))
    }

    /// Instantiate a session with a bundle configuration, attach it to the
    /// active set, and persist its metadata if a store exists.
    pub async fn create(&self, config: SessionConfig, id: Option<String>) -> AcpResult<String> {
        let session_id = id.unwrap_or_else(Self::generate_id);
        let mut session = Session::new(session_id.clone(), config.cwd.clone(), config.bundle.clone());
        if let Some(bundle) = &config.bundle {
            session.prepared_bundle = Some(self.resolve_bundle(bundle, &config.behaviors, &config.provider_config));
        }
        if config.auto_init {
            session.metadata.state = SessionState::Ready;
        }
        self.persist_metadata(&session.metadata)?;
        self.active.write().unwrap().insert(session_id.clone(), Arc::new(AsyncMutex::new(session)));
        Ok(session_id)
    }

    /// Fast path for ephemeral scoring/classification calls: loads the
    /// foundation bundle with empty behaviors and a cheap provider, never
    /// persisted. Leans on the prepared-bundle cache so repeat calls avoid
    /// re-preparing.
    pub async fn create_minimal(&self, id: Option<String>, system_prompt: Option<String>) -> AcpResult<String> {
        let session_id = id.unwrap_or_else(Self::generate_id);
        let cheap_provider = serde_json::json!({"tier": "cheap"});
        let prepared = self.resolve_bundle(MINIMAL_BUNDLE, &[], &cheap_provider);

        let mut session = Session::new(session_id.clone(), ".".to_string(), Some(MINIMAL_BUNDLE.to_string()));
        session.prepared_bundle = Some(prepared);
        session.metadata.state = SessionState::Ready;
        if let Some(prompt) = system_prompt {
            session.messages.push(Message::new(Role::System, vec![serde_json::json!({"type": "text", "text": prompt})]));
        }
        self.active.write().unwrap().insert(session_id.clone(), Arc::new(AsyncMutex::new(session)));
        Ok(session_id)
    }

    /// Rehydrate from the store. `None` if persistence is disabled or the id
    /// is unknown — never an error, per §4.6.
    pub async fn resume(&self, session_id: &str, cwd: &str) -> Option<String> {
        let dir = self.session_dir(cwd, session_id)?;
        let metadata_path = dir.join("metadata.json");
        let metadata: PersistedMetadata = serde_json::from_str(&std::fs::read_to_string(metadata_path).ok()?).ok()?;

        let messages = Self::load_messages(&dir.join("messages.jsonl"));
        let session = Session { metadata, messages, prepared_bundle: None };
        self.active.write().unwrap().insert(session_id.to_string(), Arc::new(AsyncMutex::new(session)));
        Some(session_id.to_string())
    }

    /// Enumerate persisted session ids; empty when persistence is disabled.
    pub fn list_saved(&self) -> Vec<String> {
        let Some(root) = self.persistence.storage_dir() else { return Vec::new() };
        crate::discovery::discover_sessions(None, usize::MAX)
            .into_iter()
            .map(|s| s.session_id().to_string())
            .filter(|_| root.exists())
            .collect()
    }

    /// Append a message to the session's context without triggering
    /// execution; mirrors into the on-disk message log with a timestamp.
    pub async fn inject_context(&self, session_id: &str, content: Vec<serde_json::Value>, role: Role) -> AcpResult<()> {
        let handle = self.get(session_id)?;
        let mut session = handle.lock().await;
        let message = Message::new(role, content);
        self.append_message_line(&session.metadata, &message)?;
        session.messages.push(message);
        Ok(())
    }

    /// Strip non-system messages (default) or wipe the log entirely.
    pub async fn clear_context(&self, session_id: &str, preserve_system: bool) -> AcpResult<()> {
        let handle = self.get(session_id)?;
        let mut session = handle.lock().await;
        if preserve_system {
            session.messages.retain(|m| matches!(m.role, Role::System));
        } else {
            session.messages.clear();
        }
        Ok(())
    }

    pub fn get(&self, session_id: &str) -> AcpResult<Arc<AsyncMutex<Session>>> {
        self.active
            .read()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| AcpError::UnknownSession(session_id.to_string()))
    }

    pub fn close(&self, session_id: &str) {
        self.active.write().unwrap().remove(session_id);
    }

    fn persist_metadata(&self, metadata: &PersistedMetadata) -> AcpResult<()> {
        let Some(root) = self.persistence.storage_dir() else { return Ok(()) };
        let dir = root.join(encode_project_path(&metadata.cwd)).join("sessions").join(&metadata.session_id);
        if let Err(err) = std::fs::create_dir_all(&dir) {
            tracing::warn!(error = %err, "failed to create session directory, continuing in-memory only");
            return Ok(());
        }
        let text = serde_json::to_string_pretty(metadata)?;
        if let Err(err) = std::fs::write(dir.join("metadata.json"), text) {
            tracing::warn!(error = %err, "failed to persist session metadata, continuing in-memory only");
        }
        Ok(())
    }

    fn append_message_line(&self, metadata: &PersistedMetadata, message: &Message) -> AcpResult<()> {
        let Some(root) = self.persistence.storage_dir() else { return Ok(()) };
        let dir = root.join(encode_project_path(&metadata.cwd)).join("sessions").join(&metadata.session_id);
        if std::fs::create_dir_all(&dir).is_err() {
            return Ok(());
        }
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        use std::io::Write;
        if let Ok(mut file) = std::fs::OpenOptions::new().create(true).append(true).open(dir.join("messages.jsonl")) {
            let _ = file.write_all(line.as_bytes());
        }
        Ok(())
    }

    fn load_messages(path: &std::path::Path) -> Vec<Message> {
        let Ok(text) = std::fs::read_to_string(path) else { return Vec::new() };
        text.lines().filter_map(|line| serde_json::from_str(line).ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trips_in_memory() {
        let manager = SessionManager::new(PersistenceConfig::Disabled);
        let id = manager.create(SessionConfig { cwd: "/tmp".into(), ..Default::default() }, None).await.unwrap();
        assert!(manager.get(&id).is_ok());
    }

    #[tokio::test]
    async fn unknown_session_is_an_error_not_a_panic() {
        let manager = SessionManager::new(PersistenceConfig::Disabled);
        assert!(manager.get("nope").is_err());
    }

    #[tokio::test]
    async fn create_persists_metadata_when_storage_dir_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SessionManager::new(PersistenceConfig::Enabled { storage_dir: dir.path().to_path_buf() });
        let id = manager
            .create(
                SessionConfig { cwd: "/tmp/proj".into(), bundle: Some("foundation".into()), ..Default::default() },
                Some("sess1".into()),
            )
            .await
            .unwrap();
        let expected = dir.path().join(encode_project_path("/tmp/proj")).join("sessions").join(&id).join("metadata.json");
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn create_resolves_and_caches_the_prepared_bundle() {
        let manager = SessionManager::new(PersistenceConfig::Disabled);
        let id = manager
            .create(SessionConfig { cwd: "/tmp".into(), bundle: Some("foundation".into()), ..Default::default() }, None)
            .await
            .unwrap();
        let handle = manager.get(&id).unwrap();
        let session = handle.lock().await;
        assert_eq!(session.prepared_bundle.as_deref(), Some("foundation"));
    }

    #[tokio::test]
    async fn repeated_create_minimal_calls_reuse_the_cached_bundle_handle() {
        let manager = SessionManager::new(PersistenceConfig::Disabled);
        let first = manager.create_minimal(None, None).await.unwrap();
        let second = manager.create_minimal(None, None).await.unwrap();

        let first_session = manager.get(&first).unwrap();
        let second_session = manager.get(&second).unwrap();
        let first_bundle = first_session.lock().await.prepared_bundle.clone().unwrap();
        let second_bundle = second_session.lock().await.prepared_bundle.clone().unwrap();
        assert!(Arc::ptr_eq(&first_bundle, &second_bundle), "create_minimal must reuse the cached prepared bundle");
    }

    #[tokio::test]
    async fn inject_context_does_not_change_state_or_require_execution() {
        let manager = SessionManager::new(PersistenceConfig::Disabled);
        let id = manager.create_minimal(None, None).await.unwrap();
        manager.inject_context(&id, vec![serde_json::json!({"type": "text", "text": "hello"})], Role::User).await.unwrap();
        let handle = manager.get(&id).unwrap();
        let session = handle.lock().await;
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn clear_context_preserves_system_messages_by_default() {
        let manager = SessionManager::new(PersistenceConfig::Disabled);
        let id = manager.create_minimal(None, Some("sys prompt".into())).await.unwrap();
        manager.inject_context(&id, vec![serde_json::json!({"type": "text", "text": "hi"})], Role::User).await.unwrap();
        manager.clear_context(&id, true).await.unwrap();
        let handle = manager.get(&id).unwrap();
        let session = handle.lock().await;
        assert_eq!(session.messages.len(), 1);
        assert!(matches!(session.messages[0].role, Role::System));
    }

    #[test]
    fn list_saved_is_empty_when_persistence_disabled() {
        let manager = SessionManager::new(PersistenceConfig::Disabled);
        assert!(manager.list_saved().is_empty());
    }
}
