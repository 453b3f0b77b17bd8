//! Persistent CLI configuration.

use std::path::{Path, PathBuf};

use reqmerge_core::util::normalize_text_option;
use reqmerge_core::SyncConfig;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const CONFIG_DIR_NAME: &str = "reqmerge";
const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_WORKSPACE: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(default)]
    pub remote_dir: Option<PathBuf>,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Where and how `pull`/`push` talk to the remote, after flags and file are combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub remote_dir: PathBuf,
    pub workspace: String,
    pub sync: SyncConfig,
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI config directory".to_string()))
}

/// Explicit `--config` path, else the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    explicit.map_or_else(default_config_path, |path| Ok(path.to_path_buf()))
}

impl CliConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        Self::load_from_path(&resolve_config_path(explicit)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::Config(format!(
                "Failed to read config at {}: {}",
                path.display(),
                error
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                error
            ))
        })?;
        config.normalize();
        config.sync.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                CliError::Config(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                ))
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.sync.validate()?;
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized).map_err(|error| {
            CliError::Config(format!(
                "Failed to write config at {}: {}",
                path.display(),
                error
            ))
        })
    }

    /// Combine command-line overrides with the file values.
    pub fn remote_settings(
        &self,
        remote_dir: Option<PathBuf>,
        workspace: Option<String>,
    ) -> Result<RemoteSettings, CliError> {
        let remote_dir = remote_dir.or_else(|| self.remote_dir.clone()).ok_or_else(|| {
            CliError::Config(
                "No remote directory configured; pass --remote-dir or set remote_dir in the config file"
                    .to_string(),
            )
        })?;
        let workspace = normalize_text_option(workspace)
            .or_else(|| self.workspace.clone())
            .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());

        Ok(RemoteSettings {
            remote_dir,
            workspace,
            sync: self.sync.clone(),
        })
    }

    fn normalize(&mut self) {
        self.workspace = normalize_text_option(self.workspace.take());
        self.remote_dir = self
            .remote_dir
            .take()
            .filter(|dir| !dir.as_os_str().is_empty());
    }
}
