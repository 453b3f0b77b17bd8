use std::path::Path;

use reqmerge_core::merge::merge;

use crate::commands::common::{format_merge_summary, read_collection, write_collection, write_json_output};
use crate::error::CliError;

pub fn run_merge(
    base_path: &Path,
    local_path: &Path,
    remote_path: &Path,
    as_json: bool,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let base = read_collection(base_path)?;
    let local = read_collection(local_path)?;
    let remote = read_collection(remote_path)?;

    let result = merge(&base, &local, &remote);

    if as_json {
        return write_json_output(output, &result);
    }

    for line in format_merge_summary(&result) {
        println!("{line}");
    }
    if let Some(path) = output {
        write_collection(path, &result.merged)?;
        println!("Merged collection written to {}", path.display());
    }
    Ok(())
}
