//! reqmerge-core - Three-way merge for request collections
//!
//! This crate contains the collection models, the tree helpers, the merge
//! engine, the resolution applier and the save/retry orchestration shared by
//! every reqmerge frontend.

pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod resolve;
pub mod state;
pub mod storage;
pub mod sync;
pub mod tree;
pub mod util;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use merge::{merge, ConflictType, EntityKind, ItemConflict, MergeResult};
pub use models::{Collection, CollectionItem, Environment, ItemId};
pub use resolve::{apply, ConflictResolution, ResolutionChoice};
pub use state::SaveState;
pub use sync::{SaveOrchestrator, SaveOutcome, SessionStore, SyncError};
