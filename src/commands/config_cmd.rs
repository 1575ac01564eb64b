//! Config command handlers.

use crate::config::Config;
use crate::error::Result;

/// Handle `config generate`
pub fn handle_config_generate(config: &Config, overwrite: bool) -> Result<()> {
    let path = config.generate_settings_file(overwrite)?;
    println!("Settings file generated at: {}", path.display());
    Ok(())
}

/// Handle `config show`
pub fn handle_config_show(config: &Config) {
    let manager = config.manager_config();
    println!("Current Configuration:");
    println!("  config_dir: {}", config.config_dir.display());
    println!("  profiles: {}", config.profiles_path().display());
    println!("  settings: {}", config.settings_path().display());
    println!(
        "  secret: {}",
        if config.uses_default_secret() {
            "built-in default (set MPROF_SECRET)"
        } else {
            "from MPROF_SECRET"
        }
    );
    println!("  health_ttl: {}s", manager.health_ttl.as_secs());
    println!("  idle_timeout: {}s", manager.idle_timeout.as_secs());
    println!("  failure_threshold: {}", manager.failure_threshold);
    println!("  cooldown: {}s", manager.cooldown.as_secs());
}
