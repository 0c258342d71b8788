use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use anyhow::{Context, Result};

use crate::{config::TrackerConfig, log_warn};

const ENABLE_LOGS: bool = true;

/// Tracker configuration persisted as a JSON file.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<TrackerConfig>,
}

impl ConfigStore {
    /// Loads `path` if it exists. A malformed or invalid file falls back to
    /// the defaults rather than failing startup.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            parse_or_default(&contents, &path)
        } else {
            TrackerConfig::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> TrackerConfig {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, config: TrackerConfig) -> Result<()> {
        config.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&config)?;
        *guard = config;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {}", self.path.display()))?;
        let data: TrackerConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Malformed config in {}", self.path.display()))?;
        data.validate()?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }

    fn persist(&self, data: &TrackerConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write config to {}", self.path.display()))
    }
}

fn parse_or_default(contents: &str, path: &Path) -> TrackerConfig {
    match serde_json::from_str::<TrackerConfig>(contents) {
        Ok(config) => match config.validate() {
            Ok(()) => config,
            Err(err) => {
                log_warn!("Ignoring invalid config in {}: {err}", path.display());
                TrackerConfig::default()
            }
        },
        Err(err) => {
            log_warn!("Ignoring malformed config in {}: {err}", path.display());
            TrackerConfig::default()
        }
    }
}
