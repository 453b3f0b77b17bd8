//! Shared save state types.

use serde::Serialize;

/// Save state recorded on an open collection after each save attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    AwaitingResolution,
    Saved,
    Cancelled,
    Failed,
}
