use std::io;

use reqmerge_core::sync::{RemoteError, SyncError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] reqmerge_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{}: {}", .0.user_message(), .0)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Collection {0} not found on the remote")]
    CollectionNotFound(String),
    #[error("{0} is not tracked; run `reqmerge pull` or `reqmerge publish` first")]
    NotTracked(String),
    #[error("{path} tracks collection {tracked}, not {requested}")]
    CollectionMismatch {
        path: String,
        tracked: String,
        requested: String,
    },
}
