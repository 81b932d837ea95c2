//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::Project;
use crate::grid::AutoAdvanceConfig;

/// Shelfwise configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Id written as `blame` on saved documents
    pub user: Option<String>,

    /// Skip the store entirely
    pub offline: Option<bool>,

    /// Document store file; relative paths resolve against the project root
    pub store: Option<PathBuf>,

    pub auto_advance: Option<AutoAdvanceConfig>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Global user config (~/.config/shelfwise/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read(&global_path) {
                config.merge(global);
            }
        }

        // 2. Project config (.shelfwise/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 3. Environment variables
        if let Ok(user) = std::env::var("SHELFWISE_USER") {
            if !user.is_empty() {
                config.user = Some(user);
            }
        }
        if let Ok(offline) = std::env::var("SHELFWISE_OFFLINE") {
            config.offline = Some(parse_flag(&offline));
        }

        config
    }

    fn read(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "shelfwise")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.offline.is_some() {
            self.offline = other.offline;
        }
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.auto_advance.is_some() {
            self.auto_advance = other.auto_advance;
        }
    }

    /// Get the user id, falling back to the login name
    pub fn user(&self) -> String {
        if let Some(ref user) = self.user {
            return user.clone();
        }
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn offline(&self) -> bool {
        self.offline.unwrap_or(false)
    }

    pub fn auto_advance(&self) -> AutoAdvanceConfig {
        self.auto_advance.clone().unwrap_or_default()
    }

    /// Resolve the store file for a project
    pub fn store_path(&self, project: &Project) -> PathBuf {
        match &self.store {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => project.root().join(path),
            None => project.default_store_path(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
