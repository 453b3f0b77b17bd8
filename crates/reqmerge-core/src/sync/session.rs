//! Open collections and their base snapshots.

use std::collections::HashMap;

use crate::merge::{merge, MergeResult};
use crate::models::Collection;
use crate::resolve::{apply_with_suffix, ConflictResolution};
use crate::state::SaveState;
use crate::util::unix_timestamp_millis_now;

use super::remote::VersionedCollection;

/// A remote-backed collection being edited locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCollection {
    pub workspace_id: String,
    /// Current local data, edits included
    pub data: Collection,
    /// Remote version the local data was last synced against
    pub version: String,
    /// Ancestor for the next three-way merge: the data as last loaded or saved
    pub base: Option<Collection>,
    pub dirty: bool,
    pub state: SaveState,
    /// Single user-facing status line for the last save attempt
    pub message: Option<String>,
    pub last_saved_at: Option<i64>,
    revision: u64,
}

/// Local data captured when a save starts.
#[derive(Debug, Clone)]
pub(crate) struct SaveSnapshot {
    pub workspace_id: String,
    pub data: Collection,
    pub version: String,
    pub revision: u64,
}

/// Registry of open collections, shared behind one lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    collections: HashMap<String, OpenCollection>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a collection first seen on the remote; the loaded data becomes the base.
    pub fn open(
        &mut self,
        workspace_id: impl Into<String>,
        collection_id: impl Into<String>,
        loaded: VersionedCollection,
    ) {
        let base = Some(loaded.data.clone());
        self.open_with_base(workspace_id, collection_id, loaded, base, false);
    }

    /// Track a collection restored from persisted state.
    pub fn open_with_base(
        &mut self,
        workspace_id: impl Into<String>,
        collection_id: impl Into<String>,
        current: VersionedCollection,
        base: Option<Collection>,
        dirty: bool,
    ) {
        self.collections.insert(
            collection_id.into(),
            OpenCollection {
                workspace_id: workspace_id.into(),
                data: current.data,
                version: current.version,
                base,
                dirty,
                state: SaveState::Idle,
                message: None,
                last_saved_at: None,
                revision: 0,
            },
        );
    }

    pub fn close(&mut self, collection_id: &str) -> Option<OpenCollection> {
        self.collections.remove(collection_id)
    }

    pub fn get(&self, collection_id: &str) -> Option<&OpenCollection> {
        self.collections.get(collection_id)
    }

    pub fn is_dirty(&self, collection_id: &str) -> bool {
        self.get(collection_id).is_some_and(|open| open.dirty)
    }

    pub fn base_snapshot(&self, collection_id: &str) -> Option<&Collection> {
        self.get(collection_id).and_then(|open| open.base.as_ref())
    }

    /// Drop the base snapshot, e.g. when persisted state was lost.
    pub fn clear_base_snapshot(&mut self, collection_id: &str) {
        if let Some(open) = self.collections.get_mut(collection_id) {
            open.base = None;
        }
    }

    /// Apply a local edit and mark the collection dirty.
    ///
    /// Returns `false` when the collection is not open.
    pub fn edit(&mut self, collection_id: &str, change: impl FnOnce(&mut Collection)) -> bool {
        let Some(open) = self.collections.get_mut(collection_id) else {
            return false;
        };
        change(&mut open.data);
        open.dirty = true;
        open.revision += 1;
        true
    }

    pub(crate) fn begin_save(&mut self, collection_id: &str) -> Option<SaveSnapshot> {
        let open = self.collections.get_mut(collection_id)?;
        open.state = SaveState::Saving;
        open.message = None;
        Some(SaveSnapshot {
            workspace_id: open.workspace_id.clone(),
            data: open.data.clone(),
            version: open.version.clone(),
            revision: open.revision,
        })
    }

    pub(crate) fn set_state(&mut self, collection_id: &str, state: SaveState, message: Option<String>) {
        if let Some(open) = self.collections.get_mut(collection_id) {
            open.state = state;
            open.message = message;
        }
    }

    /// Record a successful save: base, version and dirty flag move together.
    ///
    /// Edits made while the save was in flight are rebased onto the saved
    /// data and keep the collection dirty.
    pub(crate) fn mark_saved(
        &mut self,
        collection_id: &str,
        snapshot: &SaveSnapshot,
        saved: VersionedCollection,
    ) {
        let Some(open) = self.collections.get_mut(collection_id) else {
            return;
        };

        if open.revision == snapshot.revision {
            open.data = saved.data.clone();
            open.dirty = false;
        } else {
            open.data = merge(&snapshot.data, &open.data, &saved.data).merged;
            open.dirty = true;
        }
        open.base = Some(saved.data);
        open.version = saved.version;
        open.last_saved_at = Some(unix_timestamp_millis_now());
    }
}

/// The three sides of one conflict-driven merge and its outcome.
///
/// Lives for a single save attempt.
#[derive(Debug, Clone)]
pub struct MergeSession {
    pub base: Collection,
    pub local: Collection,
    pub remote: Collection,
    pub result: Option<MergeResult>,
    pub resolutions: Vec<ConflictResolution>,
}

impl MergeSession {
    pub const fn new(base: Collection, local: Collection, remote: Collection) -> Self {
        Self {
            base,
            local,
            remote,
            result: None,
            resolutions: Vec::new(),
        }
    }

    /// Run the merge once; later calls return the cached result.
    pub fn merge(&mut self) -> &MergeResult {
        self.result
            .get_or_insert_with(|| merge(&self.base, &self.local, &self.remote))
    }

    /// Apply `resolutions` to the merge result.
    pub fn resolve(&mut self, resolutions: Vec<ConflictResolution>, duplicate_suffix: &str) -> Collection {
        self.resolutions = resolutions;
        let result = self.merge().clone();
        apply_with_suffix(&result, &self.resolutions, duplicate_suffix)
    }
}
