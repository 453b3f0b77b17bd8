//! In-memory remote store for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::models::Collection;

use super::remote::{
    RemoteCollection, RemoteCollectionSet, RemoteCollections, RemoteError, VersionedCollection,
};

#[derive(Debug, Default)]
struct RemoteState {
    workspaces: HashMap<String, Vec<RemoteCollection>>,
    last_version: u64,
    injected_failures: VecDeque<RemoteError>,
}

impl RemoteState {
    fn next_version(&mut self) -> String {
        self.last_version += 1;
        self.last_version.to_string()
    }

    fn find_mut(&mut self, workspace_id: &str, collection_id: &str) -> Option<&mut RemoteCollection> {
        self.workspaces
            .get_mut(workspace_id)?
            .iter_mut()
            .find(|collection| collection.id == collection_id)
    }
}

/// Remote store kept in memory, counting calls and able to inject failures.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    state: Mutex<RemoteState>,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a collection under a fresh version, replacing any previous copy.
    pub async fn insert(&self, workspace_id: &str, collection_id: &str, data: Collection) -> String {
        let mut state = self.state.lock().await;
        let version = state.next_version();
        let collections = state.workspaces.entry(workspace_id.to_string()).or_default();
        collections.retain(|collection| collection.id != collection_id);
        collections.push(RemoteCollection {
            id: collection_id.to_string(),
            version: version.clone(),
            data,
        });
        version
    }

    /// Change a stored collection as another writer would, bumping its version.
    pub async fn update(
        &self,
        workspace_id: &str,
        collection_id: &str,
        change: impl FnOnce(&mut Collection) + Send,
    ) -> Option<String> {
        let mut state = self.state.lock().await;
        let version = state.next_version();
        let collection = state.find_mut(workspace_id, collection_id)?;
        change(&mut collection.data);
        collection.version.clone_from(&version);
        Some(version)
    }

    pub async fn delete(&self, workspace_id: &str, collection_id: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(collections) = state.workspaces.get_mut(workspace_id) else {
            return false;
        };
        let before = collections.len();
        collections.retain(|collection| collection.id != collection_id);
        collections.len() != before
    }

    pub async fn get(&self, workspace_id: &str, collection_id: &str) -> Option<VersionedCollection> {
        let mut state = self.state.lock().await;
        state
            .find_mut(workspace_id, collection_id)
            .map(|collection| VersionedCollection {
                version: collection.version.clone(),
                data: collection.data.clone(),
            })
    }

    /// Make the next save fail with `error` before any version check.
    pub async fn fail_next_save(&self, error: RemoteError) {
        self.state.lock().await.injected_failures.push_back(error);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteCollections for InMemoryRemote {
    async fn load(&self, workspace_id: &str) -> Result<RemoteCollectionSet, RemoteError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().await;
        Ok(RemoteCollectionSet {
            collections: state
                .workspaces
                .get(workspace_id)
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn save(
        &self,
        workspace_id: &str,
        collection_id: &str,
        data: &Collection,
        expected_version: &str,
    ) -> Result<VersionedCollection, RemoteError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().await;
        if let Some(error) = state.injected_failures.pop_front() {
            return Err(error);
        }

        let version = state.next_version();
        let Some(stored) = state.find_mut(workspace_id, collection_id) else {
            return Err(RemoteError::status(
                404,
                &format!("collection {collection_id} not found"),
            ));
        };
        if stored.version != expected_version {
            return Err(RemoteError::version_conflict(&format!(
                "expected version {expected_version}, found {}",
                stored.version
            )));
        }

        stored.data = data.clone();
        stored.version.clone_from(&version);
        Ok(VersionedCollection {
            version,
            data: data.clone(),
        })
    }
}
