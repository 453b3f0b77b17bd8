use std::path::Path;

use reqmerge_core::storage::JsonFileRemote;
use reqmerge_core::util::unix_timestamp_millis_now;

use crate::commands::common::{read_collection, save_state, SyncStateFile};
use crate::config::RemoteSettings;
use crate::error::CliError;

pub async fn run_publish(
    settings: &RemoteSettings,
    collection_id: &str,
    local_path: &Path,
) -> Result<(), CliError> {
    let data = read_collection(local_path)?;
    let remote = JsonFileRemote::new(&settings.remote_dir);
    let created = remote
        .create(&settings.workspace, collection_id, &data)
        .await?;

    save_state(
        local_path,
        &SyncStateFile {
            workspace_id: settings.workspace.clone(),
            collection_id: collection_id.to_string(),
            version: created.version.clone(),
            base: Some(created.data),
            synced_at: Some(unix_timestamp_millis_now()),
        },
    )?;

    println!(
        "Published {collection_id} at version {}",
        created.version
    );
    Ok(())
}
