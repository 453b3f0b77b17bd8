//! Remote collection store abstraction.
//!
//! Implementations:
//! - `InMemoryRemote` - For testing, with version conflict injection
//! - `JsonFileRemote` (in `storage`) - A directory of versioned JSON documents

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Collection;
use crate::util::compact_text;

/// HTTP status that marks an optimistic save as stale.
pub const VERSION_CONFLICT_STATUS: u16 = 409;

/// HTTP status returned when creating a collection id that is already taken.
pub const ALREADY_EXISTS_STATUS: u16 = 412;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Remote IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid remote payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RemoteError {
    pub fn status(status: u16, message: &str) -> Self {
        Self::Status {
            status,
            message: compact_text(message),
        }
    }

    /// Stale `expected_version` on save.
    pub fn version_conflict(message: &str) -> Self {
        Self::status(VERSION_CONFLICT_STATUS, message)
    }

    /// A create aimed at an existing collection.
    pub fn already_exists(message: &str) -> Self {
        Self::status(ALREADY_EXISTS_STATUS, message)
    }

    /// A 409 status is the only error the orchestrator recovers from.
    pub const fn is_version_conflict(&self) -> bool {
        matches!(
            self,
            Self::Status {
                status: VERSION_CONFLICT_STATUS,
                ..
            }
        )
    }
}

/// Collection data together with the version it was stored under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedCollection {
    pub version: String,
    pub data: Collection,
}

/// One collection of a workspace as returned by [`RemoteCollections::load`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCollection {
    pub id: String,
    pub version: String,
    pub data: Collection,
}

/// Every collection currently stored for a workspace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCollectionSet {
    pub collections: Vec<RemoteCollection>,
}

impl RemoteCollectionSet {
    pub fn get(&self, collection_id: &str) -> Option<&RemoteCollection> {
        self.collections
            .iter()
            .find(|collection| collection.id == collection_id)
    }

    /// Take one collection out of the set, dropping the rest.
    pub fn take(self, collection_id: &str) -> Option<VersionedCollection> {
        self.collections
            .into_iter()
            .find(|collection| collection.id == collection_id)
            .map(|collection| VersionedCollection {
                version: collection.version,
                data: collection.data,
            })
    }
}

/// Versioned remote storage for collections.
///
/// Implementations must be `Send + Sync` so one store can be shared by
/// concurrent saves.
#[async_trait]
pub trait RemoteCollections: Send + Sync {
    /// Load every collection of a workspace
    async fn load(&self, workspace_id: &str) -> Result<RemoteCollectionSet, RemoteError>;

    /// Store `data` if the stored version still equals `expected_version`.
    ///
    /// A stale version fails with a 409 [`RemoteError::Status`].
    async fn save(
        &self,
        workspace_id: &str,
        collection_id: &str,
        data: &Collection,
        expected_version: &str,
    ) -> Result<VersionedCollection, RemoteError>;
}
