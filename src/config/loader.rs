//! Configuration loading from the environment and `settings.kdl`.

use std::path::{Path, PathBuf};

use super::types::{CONFIG_DIR_ENV, Config, DEFAULT_SECRET, SECRET_ENV, Settings, expand_tilde};
use crate::error::{MprofError, Result};

impl Config {
    /// Get the default configuration directory.
    ///
    /// Uses the platform config directory (`~/.config/mongo-profiles` on Linux),
    /// falling back to `~/.mongo-profiles` and finally the current directory.
    pub fn default_config_dir() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            return config_dir.join("mongo-profiles");
        }
        dirs::home_dir()
            .map(|h| h.join(".mongo-profiles"))
            .unwrap_or_else(|| PathBuf::from(".mongo-profiles"))
    }

    /// Load configuration from the process environment.
    ///
    /// Reads `MPROF_CONFIG_DIR` and `MPROF_SECRET` once, then the optional
    /// `settings.kdl` from the resolved directory.
    pub fn from_env() -> Result<Self> {
        let config_dir = std::env::var(CONFIG_DIR_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| expand_tilde(v.trim()))
            .unwrap_or_else(Self::default_config_dir);

        let secret = match std::env::var(SECRET_ENV) {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!(
                    "{} is not set; stored connection strings are encrypted with the built-in default secret",
                    SECRET_ENV
                );
                DEFAULT_SECRET.to_string()
            }
        };

        let mut config = Config::new(config_dir, secret);
        config.settings = Self::load_settings(&config.settings_path())?;
        Ok(config)
    }

    /// Load settings from a specific path. A missing file yields defaults.
    pub fn load_settings(path: &Path) -> Result<Settings> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(e.into()),
        };
        knuffel::parse::<Settings>("settings.kdl", &content)
            .map_err(|e| MprofError::config(format!("{}: {}", path.display(), e)))
    }

    /// Generate a settings file with the default values commented in.
    pub fn generate_settings_file(&self, overwrite: bool) -> Result<PathBuf> {
        let path = self.settings_path();

        if path.exists() && !overwrite {
            return Err(MprofError::validation(format!(
                "Settings file already exists at: {}. Use --overwrite to replace it.",
                path.display()
            )));
        }

        std::fs::create_dir_all(&self.config_dir)?;

        let kdl_content = r#"// mongo-profiles settings
// Manager timings are in seconds.
manager health_ttl=30 idle_timeout=300 reap_interval=60 failure_threshold=3 cooldown=60

// Connection defaults; each profile's own options win field by field.
// Timeouts are in milliseconds.
// connection max_pool_size=10 min_pool_size=0 server_selection_timeout=5000 connect_timeout=10000
// connection socket_timeout=45000 heartbeat_frequency=10000 read_preference="primaryPreferred"
"#;

        std::fs::write(&path, kdl_content)?;
        Ok(path)
    }
}
