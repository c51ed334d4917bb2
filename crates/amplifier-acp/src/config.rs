use std::path::PathBuf;

/// Which transport the runtime binds. Grounded on `AcpTransportMode` from the
/// teacher, extended with `Http` since this spec covers all three transports
/// rather than just WebSocket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum TransportMode {
    Stdio,
    Http,
    Websocket,
}

impl TransportMode {
    pub fn uses_socket(&self) -> bool {
        !matches!(self, Self::Stdio)
    }
}

/// Runtime configuration, resolved from CLI flags first and environment
/// variables second — the same precedence the teacher's `ServerConfig`
/// follows.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub transport: TransportMode,
    pub persistence: PersistenceConfig,
    pub idle_timeout_secs: u64,
    pub connection_limit: usize,
    pub acp_enabled: bool,
}

/// Resolution order per the behavioral spec: explicit store argument >
/// `AMPLIFIER_NO_PERSIST` > `AMPLIFIER_STORAGE_DIR` > default
/// `<home>/.amplifier/projects/`.
#[derive(Clone, Debug)]
pub enum PersistenceConfig {
    Disabled,
    Enabled { storage_dir: PathBuf },
}

impl PersistenceConfig {
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        if let Some(dir) = explicit {
            return Self::Enabled { storage_dir: dir };
        }
        if env_truthy("AMPLIFIER_NO_PERSIST") {
            return Self::Disabled;
        }
        if let Ok(dir) = std::env::var("AMPLIFIER_STORAGE_DIR") {
            return Self::Enabled { storage_dir: PathBuf::from(dir) };
        }
        let default_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".amplifier").join("projects");
        Self::Enabled { storage_dir: default_dir }
    }

    pub fn storage_dir(&self) -> Option<&std::path::Path> {
        match self {
            Self::Disabled => None,
            Self::Enabled { storage_dir } => Some(storage_dir),
        }
    }
}

/// `AMPLIFIER_ACP_ENABLED` truthy set is `{1, true, yes}`, case-insensitively.
pub fn acp_enabled_from_env() -> bool {
    env_truthy("AMPLIFIER_ACP_ENABLED")
}

fn env_truthy(key: &str) -> bool {
    std::env::var(key).map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")).unwrap_or(false)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8700".to_string(),
            transport: TransportMode::Stdio,
            persistence: PersistenceConfig::resolve(None),
            idle_timeout_secs: 300,
            connection_limit: 64,
            acp_enabled: acp_enabled_from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn no_persist_env_wins_over_storage_dir() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("AMPLIFIER_NO_PERSIST", "1");
        std::env::set_var("AMPLIFIER_STORAGE_DIR", "/tmp/should-not-be-used");
        let cfg = PersistenceConfig::resolve(None);
        assert!(matches!(cfg, PersistenceConfig::Disabled));
        std::env::remove_var("AMPLIFIER_NO_PERSIST");
        std::env::remove_var("AMPLIFIER_STORAGE_DIR");
    }

    #[test]
    fn explicit_store_wins_over_everything() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("AMPLIFIER_NO_PERSIST", "1");
        let cfg = PersistenceConfig::resolve(Some(PathBuf::from("/explicit")));
        assert_eq!(cfg.storage_dir(), Some(std::path::Path::new("/explicit")));
        std::env::remove_var("AMPLIFIER_NO_PERSIST");
    }

    #[test]
    fn acp_enabled_accepts_truthy_variants() {
        let _guard = ENV_LOCK.lock().unwrap();
        for v in ["1", "true", "YES"] {
            std::env::set_var("AMPLIFIER_ACP_ENABLED", v);
            assert!(acp_enabled_from_env(), "{v} should be truthy");
        }
        std::env::set_var("AMPLIFIER_ACP_ENABLED", "0");
        assert!(!acp_enabled_from_env());
        std::env::remove_var("AMPLIFIER_ACP_ENABLED");
    }
}
