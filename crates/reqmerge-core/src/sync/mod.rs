//! Save/retry orchestration around the merge engine.
//!
//! A save starts optimistically with the stored version. A version conflict
//! (409) loads the remote, merges it with the local candidate and retries:
//! straight away when the merge is clean, otherwise after the
//! [`ConflictResolver`] returns resolutions and the remote has been re-read.
//! The first merge uses the base snapshot as ancestor; later ones use the
//! remote data the previous candidate was built on, so remote changes never
//! read as local edits. A remote that moved during resolution is merged
//! again before the retry. The loop is bounded by
//! [`SyncConfig::max_save_attempts`].

mod memory;
mod remote;
mod resolver;
mod session;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::models::Collection;
use crate::state::SaveState;

pub use memory::InMemoryRemote;
pub use remote::{
    RemoteCollection, RemoteCollectionSet, RemoteCollections, RemoteError, VersionedCollection,
    ALREADY_EXISTS_STATUS, VERSION_CONFLICT_STATUS,
};
pub use resolver::{ConflictResolver, FixedChoiceResolver, ResolutionOutcome};
pub use session::{MergeSession, OpenCollection, SessionStore};

use session::SaveSnapshot;

/// Terminal failures of a save request.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Collection {0} is not open")]
    NotOpen(String),

    #[error("No base snapshot for collection {0}")]
    MissingBaseSnapshot(String),

    #[error("Collection {0} no longer exists on the remote")]
    CollectionDeleted(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Gave up after {attempts} save attempts")]
    RetriesExhausted { attempts: u32 },
}

impl SyncError {
    /// Single status line shown to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::NotOpen(_) | Self::Remote(_) => "sync failed".to_string(),
            Self::MissingBaseSnapshot(_) => {
                "conflict resolution failed: base snapshot unavailable".to_string()
            }
            Self::CollectionDeleted(_) => "collection deleted".to_string(),
            Self::RetriesExhausted { attempts } => {
                format!("sync gave up after {attempts} attempts; retry manually")
            }
        }
    }
}

/// Non-error end of a save request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The user abandoned conflict resolution; the collection stays dirty
    Cancelled,
}

/// Result of reconciling a rejected save with the remote
enum Reconciled {
    Retry {
        data: Collection,
        version: String,
        ancestor: Collection,
    },
    Cancelled,
}

/// Drives saves of open collections against a versioned remote.
#[derive(Clone)]
pub struct SaveOrchestrator {
    remote: Arc<dyn RemoteCollections>,
    resolver: Arc<dyn ConflictResolver>,
    store: Arc<Mutex<SessionStore>>,
    config: SyncConfig,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SaveOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteCollections>,
        resolver: Arc<dyn ConflictResolver>,
        store: Arc<Mutex<SessionStore>>,
        config: SyncConfig,
    ) -> Self {
        Self {
            remote,
            resolver,
            store,
            config,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> Arc<Mutex<SessionStore>> {
        Arc::clone(&self.store)
    }

    /// Load a collection from the remote and open it with a fresh base snapshot.
    pub async fn open(&self, workspace_id: &str, collection_id: &str) -> Result<(), SyncError> {
        let loaded = self.load_collection(workspace_id, collection_id).await?;
        info!(
            "Opened collection {} at version {}",
            collection_id, loaded.version
        );
        self.store
            .lock()
            .await
            .open(workspace_id, collection_id, loaded);
        Ok(())
    }

    /// Save a collection, merging and retrying on version conflicts.
    ///
    /// Returns `true` on eventual success, `false` on cancellation or a
    /// terminal failure. The status line is recorded on the open collection.
    pub async fn save(&self, collection_id: &str) -> bool {
        match self.save_with_outcome(collection_id).await {
            Ok(SaveOutcome::Saved) => true,
            Ok(SaveOutcome::Cancelled) => false,
            Err(error) => {
                warn!("Save of collection {} failed: {}", collection_id, error);
                false
            }
        }
    }

    /// Like [`save`](Self::save), keeping the outcome.
    pub async fn save_with_outcome(&self, collection_id: &str) -> Result<SaveOutcome, SyncError> {
        let lock = self.collection_lock(collection_id).await;
        let _guard = lock.lock().await;

        let snapshot = self
            .store
            .lock()
            .await
            .begin_save(collection_id)
            .ok_or_else(|| SyncError::NotOpen(collection_id.to_string()))?;

        let outcome = self.run_attempts(collection_id, &snapshot).await;

        let (state, message) = match &outcome {
            Ok(SaveOutcome::Saved) => (SaveState::Saved, None),
            Ok(SaveOutcome::Cancelled) => (
                SaveState::Cancelled,
                Some("conflict resolution cancelled".to_string()),
            ),
            Err(error) => (SaveState::Failed, Some(error.user_message())),
        };
        self.store
            .lock()
            .await
            .set_state(collection_id, state, message);

        outcome
    }

    async fn collection_lock(&self, collection_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(collection_id.to_string()).or_default())
    }

    async fn run_attempts(
        &self,
        collection_id: &str,
        snapshot: &SaveSnapshot,
    ) -> Result<SaveOutcome, SyncError> {
        let attempts = self.config.max_save_attempts.max(1);
        let mut candidate = snapshot.data.clone();
        let mut version = snapshot.version.clone();
        // Remote data at `version` once a merge has taken it in; `candidate`
        // is that data plus the local changes.
        let mut ancestor: Option<Collection> = None;

        for attempt in 1..=attempts {
            debug!(
                "Saving collection {} at version {} (attempt {}/{})",
                collection_id, version, attempt, attempts
            );
            match self
                .remote
                .save(&snapshot.workspace_id, collection_id, &candidate, &version)
                .await
            {
                Ok(saved) => {
                    info!(
                        "Saved collection {} as version {}",
                        collection_id, saved.version
                    );
                    self.store
                        .lock()
                        .await
                        .mark_saved(collection_id, snapshot, saved);
                    return Ok(SaveOutcome::Saved);
                }
                Err(error) if error.is_version_conflict() => {
                    info!(
                        "Version conflict saving collection {}: {}",
                        collection_id, error
                    );
                }
                Err(error) => return Err(error.into()),
            }

            if attempt == attempts {
                break;
            }

            match self
                .reconcile(
                    collection_id,
                    &snapshot.workspace_id,
                    ancestor.take(),
                    &candidate,
                )
                .await?
            {
                Reconciled::Retry {
                    data,
                    version: latest,
                    ancestor: merged_remote,
                } => {
                    candidate = data;
                    version = latest;
                    ancestor = Some(merged_remote);
                }
                Reconciled::Cancelled => {
                    info!("Conflict resolution for {} cancelled", collection_id);
                    return Ok(SaveOutcome::Cancelled);
                }
            }
        }

        warn!(
            "Giving up on collection {} after {} save attempts",
            collection_id, attempts
        );
        Err(SyncError::RetriesExhausted { attempts })
    }

    /// Merge the rejected candidate with the current remote.
    ///
    /// `ancestor` is the remote data the candidate was built on, or `None`
    /// while the candidate is still the user's copy of the base snapshot.
    async fn reconcile(
        &self,
        collection_id: &str,
        workspace_id: &str,
        ancestor: Option<Collection>,
        candidate: &Collection,
    ) -> Result<Reconciled, SyncError> {
        let base = self
            .store
            .lock()
            .await
            .base_snapshot(collection_id)
            .cloned()
            .ok_or_else(|| SyncError::MissingBaseSnapshot(collection_id.to_string()))?;
        let mut ancestor = ancestor.unwrap_or(base);
        let mut local = candidate.clone();
        let mut remote = self.load_collection(workspace_id, collection_id).await?;

        loop {
            let mut session = MergeSession::new(ancestor, local, remote.data.clone());
            let result = session.merge();
            info!(
                "Merged collection {} with remote version {}: {} auto-merged, {} conflicts",
                collection_id,
                remote.version,
                result.auto_merged_count,
                result.conflicts.len()
            );
            if !result.has_conflicts() {
                return Ok(Reconciled::Retry {
                    data: result.merged.clone(),
                    version: remote.version,
                    ancestor: remote.data,
                });
            }

            let conflict_count = result.conflicts.len();
            self.store.lock().await.set_state(
                collection_id,
                SaveState::AwaitingResolution,
                Some(format!("{conflict_count} conflicts need resolution")),
            );
            let outcome = self.resolver.present_conflicts(collection_id, result).await;
            let ResolutionOutcome::Resolved(resolutions) = outcome else {
                return Ok(Reconciled::Cancelled);
            };

            let resolved = session.resolve(resolutions, &self.config.duplicate_suffix);
            // The remote may have moved while the user was deciding.
            let latest = self.load_collection(workspace_id, collection_id).await?;
            self.store
                .lock()
                .await
                .set_state(collection_id, SaveState::Saving, None);

            if latest.version == remote.version {
                return Ok(Reconciled::Retry {
                    data: resolved,
                    version: latest.version,
                    ancestor: remote.data,
                });
            }

            info!(
                "Collection {} moved to version {} during resolution; merging again",
                collection_id, latest.version
            );
            ancestor = remote.data;
            local = resolved;
            remote = latest;
        }
    }

    async fn load_collection(
        &self,
        workspace_id: &str,
        collection_id: &str,
    ) -> Result<VersionedCollection, SyncError> {
        self.remote
            .load(workspace_id)
            .await?
            .take(collection_id)
            .ok_or_else(|| SyncError::CollectionDeleted(collection_id.to_string()))
    }
}
