use std::io::{self, Write};
use std::path::{Path, PathBuf};

use reqmerge_core::merge::{EntityKind, ItemConflict, MergeResult};
use reqmerge_core::util::compact_text;
use reqmerge_core::Collection;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const STATE_FILE_SUFFIX: &str = "sync.json";

/// Sidecar kept next to a pulled collection file.
///
/// Holds what the save orchestrator needs across runs: the remote version the
/// local file was synced against and the base snapshot for the next merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStateFile {
    pub workspace_id: String,
    pub collection_id: String,
    pub version: String,
    #[serde(default)]
    pub base: Option<Collection>,
    #[serde(default)]
    pub synced_at: Option<i64>,
}

pub fn read_collection(path: &Path) -> Result<Collection, CliError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(Collection::from_json(&raw)?)
}

pub fn write_collection(path: &Path, collection: &Collection) -> Result<(), CliError> {
    std::fs::write(path, collection.to_json_pretty()?)?;
    Ok(())
}

/// Pretty JSON to `output`, or stdout when omitted.
pub fn write_json_output(output: Option<&Path>, value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    if let Some(path) = output {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        let mut stdout = io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        writeln!(stdout)?;
    }
    Ok(())
}

/// `api.json` -> `api.sync.json`
pub fn state_path(local: &Path) -> PathBuf {
    local.with_extension(STATE_FILE_SUFFIX)
}

pub fn load_state(local: &Path) -> Result<Option<SyncStateFile>, CliError> {
    let path = state_path(local);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

pub fn save_state(local: &Path, state: &SyncStateFile) -> Result<(), CliError> {
    std::fs::write(state_path(local), serde_json::to_string_pretty(state)?)?;
    Ok(())
}

pub fn format_conflict_line(conflict: &ItemConflict) -> String {
    let kind = match conflict.item_type {
        EntityKind::Item => "item",
        EntityKind::Environment => "environment",
    };
    format!(
        "{:<13}  {:<11}  {}  ({})",
        conflict.conflict_type.label(),
        kind,
        compact_text(&conflict.path.join(" / ")),
        conflict.id
    )
}

/// Local and remote names of a conflicting entity, `-` for a deleted side.
pub fn format_conflict_sides(conflict: &ItemConflict) -> String {
    let side = |version: Option<&reqmerge_core::merge::EntityVersion>| {
        version.map_or_else(|| "-".to_string(), |version| version.name().to_string())
    };
    format!(
        "local: {}  remote: {}",
        side(conflict.local_version.as_ref()),
        side(conflict.remote_version.as_ref())
    )
}

pub fn format_merge_summary(result: &MergeResult) -> Vec<String> {
    let mut lines = vec![format!(
        "{} auto-merged, {} unchanged, {} conflicts",
        result.auto_merged_count,
        result.unchanged_count,
        result.conflicts.len()
    )];
    lines.extend(
        result
            .conflicts
            .iter()
            .map(|conflict| format!("  {}", format_conflict_line(conflict))),
    );
    lines
}
