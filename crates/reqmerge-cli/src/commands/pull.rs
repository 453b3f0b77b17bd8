use std::path::Path;

use reqmerge_core::storage::JsonFileRemote;
use reqmerge_core::sync::RemoteCollections;
use reqmerge_core::util::unix_timestamp_millis_now;

use crate::commands::common::{save_state, write_collection, SyncStateFile};
use crate::config::RemoteSettings;
use crate::error::CliError;

pub async fn run_pull(
    settings: &RemoteSettings,
    collection_id: &str,
    local_path: &Path,
) -> Result<(), CliError> {
    let remote = JsonFileRemote::new(&settings.remote_dir);
    let loaded = remote
        .load(&settings.workspace)
        .await?
        .take(collection_id)
        .ok_or_else(|| CliError::CollectionNotFound(collection_id.to_string()))?;

    write_collection(local_path, &loaded.data)?;
    save_state(
        local_path,
        &SyncStateFile {
            workspace_id: settings.workspace.clone(),
            collection_id: collection_id.to_string(),
            version: loaded.version.clone(),
            base: Some(loaded.data),
            synced_at: Some(unix_timestamp_millis_now()),
        },
    )?;

    println!(
        "Pulled {collection_id} at version {} into {}",
        loaded.version,
        local_path.display()
    );
    Ok(())
}
