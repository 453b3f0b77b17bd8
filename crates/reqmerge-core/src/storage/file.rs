//! Directory-backed remote: one versioned JSON document per collection.
//!
//! Layout is `<root>/<workspace_id>/<collection_id>.json`, each file holding
//! `{ "version": "<n>", "data": <collection> }`. Versions are decimal
//! counters bumped on every save.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::Collection;
use crate::sync::{
    RemoteCollection, RemoteCollectionSet, RemoteCollections, RemoteError, VersionedCollection,
};

const DOCUMENT_EXTENSION: &str = "json";
const INITIAL_VERSION: &str = "1";

/// Versioned collection documents stored under a root directory.
#[derive(Debug)]
pub struct JsonFileRemote {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRemote {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a new collection at the initial version.
    ///
    /// Fails with status 412 when the collection already exists.
    pub async fn create(
        &self,
        workspace_id: &str,
        collection_id: &str,
        data: &Collection,
    ) -> Result<VersionedCollection, RemoteError> {
        let path = self.document_path(workspace_id, collection_id)?;
        let _guard = self.write_lock.lock().await;
        if fs::try_exists(&path).await? {
            return Err(RemoteError::already_exists(&format!(
                "collection {collection_id} already exists"
            )));
        }

        let document = VersionedCollection {
            version: INITIAL_VERSION.to_string(),
            data: data.clone(),
        };
        write_document(&path, &document).await?;
        Ok(document)
    }

    fn workspace_dir(&self, workspace_id: &str) -> Result<PathBuf, RemoteError> {
        validate_segment(workspace_id, "workspace id")?;
        Ok(self.root.join(workspace_id))
    }

    fn document_path(&self, workspace_id: &str, collection_id: &str) -> Result<PathBuf, RemoteError> {
        validate_segment(collection_id, "collection id")?;
        Ok(self
            .workspace_dir(workspace_id)?
            .join(format!("{collection_id}.{DOCUMENT_EXTENSION}")))
    }
}

#[async_trait]
impl RemoteCollections for JsonFileRemote {
    async fn load(&self, workspace_id: &str) -> Result<RemoteCollectionSet, RemoteError> {
        let dir = self.workspace_dir(workspace_id)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(RemoteCollectionSet::default());
            }
            Err(error) => return Err(error.into()),
        };

        let mut collections = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let document = read_document(&path).await?;
            collections.push(RemoteCollection {
                id: id.to_string(),
                version: document.version,
                data: document.data,
            });
        }
        collections.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(
            "Loaded {} collections from {}",
            collections.len(),
            dir.display()
        );
        Ok(RemoteCollectionSet { collections })
    }

    async fn save(
        &self,
        workspace_id: &str,
        collection_id: &str,
        data: &Collection,
        expected_version: &str,
    ) -> Result<VersionedCollection, RemoteError> {
        let path = self.document_path(workspace_id, collection_id)?;
        let _guard = self.write_lock.lock().await;

        let current = match read_document(&path).await {
            Ok(document) => document,
            Err(RemoteError::Io(error)) if error.kind() == ErrorKind::NotFound => {
                return Err(RemoteError::status(
                    404,
                    &format!("collection {collection_id} not found"),
                ));
            }
            Err(error) => return Err(error),
        };
        if current.version != expected_version {
            return Err(RemoteError::version_conflict(&format!(
                "expected version {expected_version}, found {}",
                current.version
            )));
        }

        let document = VersionedCollection {
            version: next_version(&current.version),
            data: data.clone(),
        };
        write_document(&path, &document).await?;
        debug!(
            "Wrote collection {} version {}",
            collection_id, document.version
        );
        Ok(document)
    }
}

fn validate_segment(value: &str, label: &str) -> Result<(), RemoteError> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && !value.chars().any(char::is_control);
    if valid {
        Ok(())
    } else {
        Err(RemoteError::status(400, &format!("invalid {label}: {value:?}")))
    }
}

fn next_version(current: &str) -> String {
    current
        .trim()
        .parse::<u64>()
        .map_or_else(|_| INITIAL_VERSION.to_string(), |version| (version + 1).to_string())
}

async fn read_document(path: &Path) -> Result<VersionedCollection, RemoteError> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write through a temporary sibling so readers never see a partial file.
async fn write_document(path: &Path, document: &VersionedCollection) -> Result<(), RemoteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_string_pretty(document)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, payload).await?;
    fs::rename(&staging, path).await?;
    Ok(())
}
