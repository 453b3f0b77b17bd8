//! Conflict resolution hand-off.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::merge::MergeResult;
use crate::resolve::{resolve_all, ConflictResolution, ResolutionChoice};

/// What the user decided for a set of conflicts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved(Vec<ConflictResolution>),
    /// Abandon the save and leave the collection dirty
    Cancelled,
}

/// Presents conflicts to a user and waits for their decision.
///
/// The orchestrator awaits this without a timeout.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn present_conflicts(&self, collection_id: &str, result: &MergeResult) -> ResolutionOutcome;
}

/// Resolves every conflict with the same choice, or cancels.
#[derive(Debug, Default)]
pub struct FixedChoiceResolver {
    choice: Option<ResolutionChoice>,
    presented: AtomicUsize,
}

impl FixedChoiceResolver {
    pub const fn new(choice: ResolutionChoice) -> Self {
        Self {
            choice: Some(choice),
            presented: AtomicUsize::new(0),
        }
    }

    /// A resolver that cancels every prompt
    pub const fn cancelling() -> Self {
        Self {
            choice: None,
            presented: AtomicUsize::new(0),
        }
    }

    /// Number of times conflicts were presented
    pub fn presented_count(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConflictResolver for FixedChoiceResolver {
    async fn present_conflicts(&self, _collection_id: &str, result: &MergeResult) -> ResolutionOutcome {
        self.presented.fetch_add(1, Ordering::SeqCst);
        match self.choice {
            Some(choice) => ResolutionOutcome::Resolved(resolve_all(result, choice)),
            None => ResolutionOutcome::Cancelled,
        }
    }
}
