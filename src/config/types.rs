//! Configuration type definitions.

use knuffel::Decode;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::connection::{ManagerConfig, ResolvedOptions};
use crate::crypto::UriCipher;

/// Environment variable holding the encryption secret.
pub const SECRET_ENV: &str = "MPROF_SECRET";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "MPROF_CONFIG_DIR";

/// Used when `MPROF_SECRET` is unset. Anyone with this value and the
/// profiles file can read every stored connection string.
pub const DEFAULT_SECRET: &str = "mprof-default-insecure-secret";

/// Expand tilde (~) prefix to the user's home directory.
/// Handles both "~" alone and "~/path/to/something" patterns.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Optional tuning read from `settings.kdl`.
#[derive(Debug, Decode, Clone, Default)]
pub struct Settings {
    #[knuffel(child)]
    pub manager: Option<ManagerSettings>,

    #[knuffel(child)]
    pub connection: Option<ConnectionSettings>,
}

/// Connection manager timings, all in seconds.
#[derive(Debug, Decode, Clone, Default)]
pub struct ManagerSettings {
    #[knuffel(property(name = "health_ttl"))]
    pub health_ttl: Option<u64>,

    #[knuffel(property(name = "idle_timeout"))]
    pub idle_timeout: Option<u64>,

    #[knuffel(property(name = "reap_interval"))]
    pub reap_interval: Option<u64>,

    #[knuffel(property(name = "failure_threshold"))]
    pub failure_threshold: Option<u32>,

    #[knuffel(property)]
    pub cooldown: Option<u64>,
}

/// Connection defaults that every profile inherits unless it overrides them.
/// Timeouts are in milliseconds.
#[derive(Debug, Decode, Clone, Default)]
pub struct ConnectionSettings {
    #[knuffel(property(name = "max_pool_size"))]
    pub max_pool_size: Option<u32>,

    #[knuffel(property(name = "min_pool_size"))]
    pub min_pool_size: Option<u32>,

    #[knuffel(property(name = "max_idle_time"))]
    pub max_idle_time: Option<u64>,

    #[knuffel(property(name = "server_selection_timeout"))]
    pub server_selection_timeout: Option<u64>,

    #[knuffel(property(name = "connect_timeout"))]
    pub connect_timeout: Option<u64>,

    #[knuffel(property(name = "socket_timeout"))]
    pub socket_timeout: Option<u64>,

    #[knuffel(property(name = "heartbeat_frequency"))]
    pub heartbeat_frequency: Option<u64>,

    #[knuffel(property(name = "retry_writes"))]
    pub retry_writes: Option<bool>,

    #[knuffel(property(name = "retry_reads"))]
    pub retry_reads: Option<bool>,

    #[knuffel(property(name = "read_preference"))]
    pub read_preference: Option<String>,
}

/// Process-wide configuration, read once at startup and handed to the
/// store and the manager.
#[derive(Clone)]
pub struct Config {
    pub config_dir: PathBuf,
    pub secret: String,
    pub settings: Settings,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("config_dir", &self.config_dir)
            .field("secret", &"<redacted>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl Config {
    /// Build a configuration from explicit values.
    pub fn new(config_dir: PathBuf, secret: impl Into<String>) -> Self {
        Self {
            config_dir,
            secret: secret.into(),
            settings: Settings::default(),
        }
    }

    /// Whether the built-in default secret is in use.
    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }

    /// Path to the encrypted profiles file.
    pub fn profiles_path(&self) -> PathBuf {
        self.config_dir.join("profiles.json")
    }

    /// Path to the optional settings file.
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.kdl")
    }

    /// Cipher keyed from the configured secret.
    pub fn cipher(&self) -> UriCipher {
        UriCipher::new(&self.secret)
    }

    /// Manager timings and connection defaults with settings applied over
    /// the built-in values.
    pub fn manager_config(&self) -> ManagerConfig {
        let mut config = ManagerConfig::default();

        if let Some(m) = &self.settings.manager {
            if let Some(secs) = m.health_ttl {
                config.health_ttl = Duration::from_secs(secs);
            }
            if let Some(secs) = m.idle_timeout {
                config.idle_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = m.reap_interval {
                config.reap_interval = Duration::from_secs(secs.max(1));
            }
            if let Some(n) = m.failure_threshold {
                config.failure_threshold = n.max(1);
            }
            if let Some(secs) = m.cooldown {
                config.cooldown = Duration::from_secs(secs);
            }
        }

        if let Some(c) = &self.settings.connection {
            apply_connection_settings(&mut config.defaults, c);
        }

        config
    }
}

fn apply_connection_settings(defaults: &mut ResolvedOptions, c: &ConnectionSettings) {
    if let Some(v) = c.max_pool_size {
        defaults.max_pool_size = v;
    }
    if let Some(v) = c.min_pool_size {
        defaults.min_pool_size = v;
    }
    if let Some(ms) = c.max_idle_time {
        defaults.max_idle_time = Duration::from_millis(ms);
    }
    if let Some(ms) = c.server_selection_timeout {
        defaults.server_selection_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = c.connect_timeout {
        defaults.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = c.socket_timeout {
        defaults.socket_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = c.heartbeat_frequency {
        defaults.heartbeat_frequency = Duration::from_millis(ms);
    }
    if let Some(v) = c.retry_writes {
        defaults.retry_writes = v;
    }
    if let Some(v) = c.retry_reads {
        defaults.retry_reads = v;
    }
    if let Some(v) = &c.read_preference {
        defaults.read_preference = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_override_manager_defaults() {
        let kdl = r#"
manager health_ttl=10 failure_threshold=5 cooldown=120
connection max_pool_size=25 read_preference="secondary"
"#;
        let settings = knuffel::parse::<Settings>("settings.kdl", kdl).unwrap();
        let mut config = Config::new(PathBuf::from("/tmp/mprof"), "secret");
        config.settings = settings;

        let mc = config.manager_config();
        assert_eq!(mc.health_ttl, Duration::from_secs(10));
        assert_eq!(mc.failure_threshold, 5);
        assert_eq!(mc.cooldown, Duration::from_secs(120));
        // Untouched values keep their built-in defaults
        assert_eq!(mc.idle_timeout, Duration::from_secs(300));
        assert_eq!(mc.defaults.max_pool_size, 25);
        assert_eq!(mc.defaults.read_preference, "secondary");
        assert!(mc.defaults.retry_writes);
    }

    #[test]
    fn test_empty_settings_file() {
        let settings = knuffel::parse::<Settings>("settings.kdl", "").unwrap();
        assert!(settings.manager.is_none());
        assert!(settings.connection.is_none());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = Config::new(PathBuf::from("/tmp/mprof"), "hunter2-very-secret");
        let shown = format!("{:?}", config);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("/tmp/mprof"));
    }

    #[test]
    fn test_paths() {
        let config = Config::new(PathBuf::from("/tmp/mprof"), "secret");
        assert_eq!(config.profiles_path(), PathBuf::from("/tmp/mprof/profiles.json"));
        assert_eq!(config.settings_path(), PathBuf::from("/tmp/mprof/settings.kdl"));
        assert!(!config.uses_default_secret());
    }
}
