use std::path::{Path, PathBuf};

use reqmerge_core::util::normalize_text_option;

use crate::cli::ConfigCommands;
use crate::config::{resolve_config_path, CliConfig};
use crate::error::CliError;

pub fn run_config(
    command: ConfigCommands,
    config_path: Option<&Path>,
    remote_dir: Option<PathBuf>,
    workspace: Option<String>,
) -> Result<(), CliError> {
    let path = resolve_config_path(config_path)?;
    match command {
        ConfigCommands::Init {
            max_save_attempts,
            duplicate_suffix,
        } => {
            let config = CliConfig::load_from_path(&path)?;
            let updated = apply_config_updates(
                config,
                remote_dir,
                workspace,
                max_save_attempts,
                duplicate_suffix,
            );
            updated.save_to_path(&path)?;
            println!("Saved config to {}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = CliConfig::load_from_path(&path)?;
            println!("config: {}", path.display());
            for line in format_config_lines(&config) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Merge `config init` flags into an existing config; omitted flags keep current values.
pub fn apply_config_updates(
    mut config: CliConfig,
    remote_dir: Option<PathBuf>,
    workspace: Option<String>,
    max_save_attempts: Option<u32>,
    duplicate_suffix: Option<String>,
) -> CliConfig {
    if let Some(dir) = remote_dir {
        config.remote_dir = Some(dir);
    }
    if let Some(workspace) = normalize_text_option(workspace) {
        config.workspace = Some(workspace);
    }
    if let Some(attempts) = max_save_attempts {
        config.sync.max_save_attempts = attempts;
    }
    if let Some(suffix) = duplicate_suffix {
        config.sync.duplicate_suffix = suffix;
    }
    config
}

pub fn format_config_lines(config: &CliConfig) -> Vec<String> {
    vec![
        format!(
            "remote_dir: {}",
            config
                .remote_dir
                .as_ref()
                .map_or_else(|| "(not set)".to_string(), |dir| dir.display().to_string())
        ),
        format!(
            "workspace: {}",
            config.workspace.as_deref().unwrap_or("(default)")
        ),
        format!("max_save_attempts: {}", config.sync.max_save_attempts),
        format!("duplicate_suffix: {:?}", config.sync.duplicate_suffix),
    ]
}
