use std::path::Path;
use std::sync::Arc;

use reqmerge_core::storage::JsonFileRemote;
use reqmerge_core::sync::{
    ConflictResolver, FixedChoiceResolver, SaveOrchestrator, SaveOutcome, SessionStore,
    VersionedCollection,
};
use reqmerge_core::util::unix_timestamp_millis_now;
use tokio::sync::Mutex;

use crate::cli::Preference;
use crate::commands::common::{
    load_state, read_collection, save_state, write_collection, SyncStateFile,
};
use crate::config::RemoteSettings;
use crate::error::CliError;
use crate::resolver::PromptResolver;

pub async fn run_push(
    settings: &RemoteSettings,
    collection_id: &str,
    local_path: &Path,
    prefer: Option<Preference>,
) -> Result<(), CliError> {
    let resolver: Arc<dyn ConflictResolver> = match prefer {
        Some(preference) => Arc::new(FixedChoiceResolver::new(preference.into())),
        None => Arc::new(PromptResolver),
    };
    push_with_resolver(settings, collection_id, local_path, resolver).await
}

pub async fn push_with_resolver(
    settings: &RemoteSettings,
    collection_id: &str,
    local_path: &Path,
    resolver: Arc<dyn ConflictResolver>,
) -> Result<(), CliError> {
    let data = read_collection(local_path)?;
    let state = load_state(local_path)?
        .ok_or_else(|| CliError::NotTracked(local_path.display().to_string()))?;
    if state.collection_id != collection_id {
        return Err(CliError::CollectionMismatch {
            path: local_path.display().to_string(),
            tracked: state.collection_id,
            requested: collection_id.to_string(),
        });
    }

    let dirty = state.base.as_ref() != Some(&data);
    if !dirty {
        println!("{collection_id} has no local changes");
        return Ok(());
    }

    let store = Arc::new(Mutex::new(SessionStore::new()));
    store.lock().await.open_with_base(
        state.workspace_id.clone(),
        collection_id,
        VersionedCollection {
            version: state.version,
            data,
        },
        state.base,
        dirty,
    );

    let remote = Arc::new(JsonFileRemote::new(&settings.remote_dir));
    let orchestrator = SaveOrchestrator::new(remote, resolver, store.clone(), settings.sync.clone());

    match orchestrator.save_with_outcome(collection_id).await? {
        SaveOutcome::Saved => {
            let store = store.lock().await;
            let Some(open) = store.get(collection_id) else {
                return Err(CliError::CollectionNotFound(collection_id.to_string()));
            };
            write_collection(local_path, &open.data)?;
            save_state(
                local_path,
                &SyncStateFile {
                    workspace_id: open.workspace_id.clone(),
                    collection_id: collection_id.to_string(),
                    version: open.version.clone(),
                    base: open.base.clone(),
                    synced_at: Some(unix_timestamp_millis_now()),
                },
            )?;
            println!("Pushed {collection_id} as version {}", open.version);
        }
        SaveOutcome::Cancelled => {
            println!("Push of {collection_id} cancelled; local changes kept");
        }
    }
    Ok(())
}
