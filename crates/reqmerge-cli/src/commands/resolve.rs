use std::path::Path;

use reqmerge_core::resolve::{apply_with_suffix, validate_resolutions};
use reqmerge_core::{ConflictResolution, MergeResult, SyncConfig};

use crate::commands::common::write_json_output;
use crate::error::CliError;

pub fn run_resolve(
    result_path: &Path,
    resolutions_path: &Path,
    output: Option<&Path>,
    sync: &SyncConfig,
) -> Result<(), CliError> {
    let result = MergeResult::from_json(&std::fs::read_to_string(result_path)?)?;
    let resolutions: Vec<ConflictResolution> =
        serde_json::from_str(&std::fs::read_to_string(resolutions_path)?)?;

    validate_resolutions(&result, &resolutions)?;
    let unresolved = result
        .conflicts
        .iter()
        .filter(|conflict| {
            !resolutions
                .iter()
                .any(|resolution| resolution.conflict_id == conflict.id)
        })
        .count();
    if unresolved > 0 {
        tracing::warn!("{unresolved} conflicts left unresolved; keeping local versions");
    }

    let resolved = apply_with_suffix(&result, &resolutions, &sync.duplicate_suffix);
    write_json_output(output, &resolved)
}
