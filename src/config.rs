use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest budget that can be configured (minutes)
pub const MAX_TIMER_MINUTES: u32 = 24 * 60;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Parent session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Validity of a normal parent session (minutes)
    #[serde(default = "default_session_timeout")]
    pub timeout_minutes: u32,

    /// Validity of an emergency session (minutes)
    #[serde(default = "default_emergency_timeout")]
    pub emergency_timeout_minutes: u32,
}

/// Lock surface settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LockConfig {
    /// Consecutive failures before the cool-down starts
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Cool-down after too many failures (minutes)
    #[serde(default = "default_cooldown")]
    pub cooldown_minutes: u32,

    /// Code accepted by the emergency unlock path
    #[serde(default = "default_emergency_code")]
    pub emergency_code: String,
}

/// Countdown timer settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimerConfig {
    /// Longest budget a parent may start (minutes)
    #[serde(default = "default_max_minutes")]
    pub max_minutes: u32,

    /// Keep a paused timer across restarts instead of discarding it
    #[serde(default = "default_true")]
    pub restore_paused: bool,

    /// Remaining-time marks (seconds) at which a warning is shown
    #[serde(default = "default_warnings")]
    pub warnings_seconds: Vec<u32>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Where persisted records live
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Overrides the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_session_timeout() -> u32 {
    30
}

fn default_emergency_timeout() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_cooldown() -> u32 {
    5
}

fn default_emergency_code() -> String {
    "EMERGENCY123".to_string()
}

fn default_max_minutes() -> u32 {
    480
}

fn default_true() -> bool {
    true
}

fn default_warnings() -> Vec<u32> {
    vec![600, 300, 120, 30]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_minutes: default_session_timeout(),
            emergency_timeout_minutes: default_emergency_timeout(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> TimeDelta {
        TimeDelta::minutes(self.timeout_minutes as i64)
    }

    pub fn emergency_timeout(&self) -> TimeDelta {
        TimeDelta::minutes(self.emergency_timeout_minutes as i64)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            cooldown_minutes: default_cooldown(),
            emergency_code: default_emergency_code(),
        }
    }
}

impl LockConfig {
    pub fn cooldown(&self) -> TimeDelta {
        TimeDelta::minutes(self.cooldown_minutes as i64)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            max_minutes: default_max_minutes(),
            restore_paused: default_true(),
            warnings_seconds: default_warnings(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.session.timeout_minutes == 0 {
            anyhow::bail!("Session timeout must be at least 1 minute");
        }

        if self.session.emergency_timeout_minutes == 0 {
            anyhow::bail!("Emergency session timeout must be at least 1 minute");
        }

        if self.session.emergency_timeout_minutes > self.session.timeout_minutes {
            anyhow::bail!(
                "Emergency timeout ({} min) must not exceed the session timeout ({} min)",
                self.session.emergency_timeout_minutes,
                self.session.timeout_minutes
            );
        }

        if self.lock.max_attempts == 0 {
            anyhow::bail!("Lock max_attempts must be at least 1");
        }

        if self.lock.emergency_code.trim().len() < 6 {
            anyhow::bail!("Emergency code must be at least 6 characters");
        }

        if self.timer.max_minutes == 0 {
            anyhow::bail!("Timer max_minutes must be at least 1");
        }

        if self.timer.max_minutes > MAX_TIMER_MINUTES {
            anyhow::bail!(
                "Timer max_minutes must be at most {} (one day)",
                MAX_TIMER_MINUTES
            );
        }

        Ok(())
    }

    /// Data directory for persisted records
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::store::get_data_dir(),
        }
    }
}

/// Get the platform-specific config file path
pub fn get_config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "screen-guard")
        .context("Could not determine config directory location")?;

    Ok(dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.session.timeout_minutes, 30);
        assert_eq!(config.session.emergency_timeout_minutes, 10);
        assert_eq!(config.lock.max_attempts, 3);
        assert_eq!(config.lock.cooldown_minutes, 5);
        assert_eq!(config.timer.max_minutes, 480);
        assert!(config.timer.restore_paused);
        assert_eq!(config.timer.warnings_seconds, vec![600, 300, 120, 30]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [session]
            timeout_minutes = 45

            [timer]
            restore_paused = false
            "#,
        )
        .unwrap();

        assert_eq!(config.session.timeout_minutes, 45);
        assert_eq!(config.session.emergency_timeout_minutes, 10);
        assert!(!config.timer.restore_paused);
        assert_eq!(config.lock.emergency_code, "EMERGENCY123");
    }

    #[test]
    fn test_rejects_emergency_longer_than_session() {
        let mut config = AppConfig::default();
        config.session.emergency_timeout_minutes = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_timer_longer_than_a_day() {
        let mut config = AppConfig::default();
        config.timer.max_minutes = MAX_TIMER_MINUTES;
        assert!(config.validate().is_ok());

        config.timer.max_minutes = u32::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut config = AppConfig::default();
        config.lock.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.lock.cooldown_minutes = 7;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.lock.cooldown_minutes, 7);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp_dir = tempdir().unwrap();
        let config = AppConfig::load_or_default(&temp_dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.session.timeout_minutes, 30);
    }
}
