pub mod run;
pub mod setup;
pub mod shell;
pub mod status;
pub mod utils;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use screen_guard::config::{AppConfig, get_config_path};
use screen_guard::store::{FileStore, Store};

/// Configuration and storage shared by every command
pub struct Environment {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub store: Arc<dyn Store>,
    pub data_dir: PathBuf,
}

impl Environment {
    pub fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => get_config_path()?,
        };

        let config = AppConfig::load_or_default(&config_path)
            .context("Failed to load configuration")?;

        let data_dir = match data_dir {
            Some(dir) => dir,
            None => config.data_dir()?,
        };

        Ok(Self {
            config,
            config_path,
            store: Arc::new(FileStore::new(data_dir.clone())),
            data_dir,
        })
    }
}
