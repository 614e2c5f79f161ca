use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use screen_guard::clock::SystemClock;
use screen_guard::config::{AppConfig, get_config_path};
use screen_guard::security::{SessionAuthority, SessionPolicy};

use super::Environment;

/// Write a configuration file with the default settings
pub fn init_config(output: Option<PathBuf>, force: bool) -> Result<()> {
    let output_path = match output {
        Some(path) => path,
        None => get_config_path()?,
    };

    if output_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists: {}\nUse --force to overwrite",
            output_path.display()
        );
    }

    AppConfig::default().save(&output_path)?;

    println!("✓ Created configuration file: {}", output_path.display());
    println!("\nEdit this file to change session timeouts, the emergency code");
    println!("and the longest screen-time budget a parent may start.");

    Ok(())
}

/// End the persisted parent session
pub fn logout(env: &Environment) -> Result<()> {
    let mut session = SessionAuthority::load(
        Arc::new(SystemClock),
        env.store.clone(),
        SessionPolicy::from(&env.config.session),
    );
    session.logout();
    println!("✓ Parent session ended");
    Ok(())
}
