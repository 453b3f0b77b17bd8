//! Three-way merge of collections.
//!
//! Items and environments are joined by id across the base, local and
//! remote copies. Every id in the union of the three sides is classified
//! exactly once:
//!
//! | base | local | remote | outcome |
//! |------|-------|--------|---------|
//! | -    | yes   | -      | keep local |
//! | -    | -     | yes    | add remote copy |
//! | -    | yes   | yes    | equal: nothing to do, else `update` conflict |
//! | yes  | -     | yes    | remote unchanged: accept delete, else `delete-local` conflict |
//! | yes  | yes   | -      | local unchanged: accept delete, else `delete-remote` conflict |
//! | yes  | yes   | yes    | take whichever side changed; both changed differently: `update` conflict |
//! | yes  | -     | -      | deleted on both sides |
//!
//! The merged collection starts as a copy of local, so local wins anything
//! that is not resolved otherwise. Entity equality covers the entity's own
//! fields only; a folder's children are classified through their own ids.

mod conflict;

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::models::{find_environment, Collection, CollectionItem, Environment, ItemId};
use crate::tree;

pub use conflict::{ConflictType, EntityKind, EntityVersion, ItemConflict, MergeResult};

/// Classification of one id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    /// Present and unchanged on every side
    Unchanged,
    /// Local holds the only change (or the only copy)
    KeepLocal,
    /// Both sides made the same change
    Identical,
    /// Local deleted an entity remote left alone
    AcceptLocalDelete,
    /// Deleted on both sides
    BothDeleted,
    /// Entity only exists on remote
    AddRemote,
    /// Remote holds the only change
    TakeRemote,
    /// Remote deleted an entity local left alone
    AcceptRemoteDelete,
    Conflict(ConflictType),
}

impl Decision {
    const fn is_auto_merged(self) -> bool {
        !matches!(self, Self::Unchanged | Self::Conflict(_))
    }
}

fn classify<T>(
    base: Option<&T>,
    local: Option<&T>,
    remote: Option<&T>,
    same: impl Fn(&T, &T) -> bool,
) -> Decision {
    match (base, local, remote) {
        (None, Some(_), None) => Decision::KeepLocal,
        (None, None, Some(_)) => Decision::AddRemote,
        (None, Some(local), Some(remote)) => {
            if same(local, remote) {
                Decision::Identical
            } else {
                Decision::Conflict(ConflictType::Update)
            }
        }
        (Some(base), None, Some(remote)) => {
            if same(remote, base) {
                Decision::AcceptLocalDelete
            } else {
                Decision::Conflict(ConflictType::DeleteLocal)
            }
        }
        (Some(base), Some(local), None) => {
            if same(local, base) {
                Decision::AcceptRemoteDelete
            } else {
                Decision::Conflict(ConflictType::DeleteRemote)
            }
        }
        (Some(base), Some(local), Some(remote)) => {
            match (same(local, base), same(remote, base)) {
                (true, true) => Decision::Unchanged,
                (true, false) => Decision::TakeRemote,
                (false, true) => Decision::KeepLocal,
                (false, false) if same(local, remote) => Decision::Identical,
                (false, false) => Decision::Conflict(ConflictType::Update),
            }
        }
        (Some(_), None, None) => Decision::BothDeleted,
        (None, None, None) => Decision::Unchanged,
    }
}

#[derive(Debug, Default)]
struct Tally {
    auto_merged: usize,
    unchanged: usize,
    conflicts: Vec<ItemConflict>,
}

impl Tally {
    fn record(&mut self, decision: Decision) {
        if decision.is_auto_merged() {
            self.auto_merged += 1;
        } else if decision == Decision::Unchanged {
            self.unchanged += 1;
        }
    }
}

/// Merge `local` and `remote` against their common ancestor `base`.
///
/// Pure and total: never fails, never touches its inputs.
pub fn merge(base: &Collection, local: &Collection, remote: &Collection) -> MergeResult {
    let mut merged = local.clone();
    let mut tally = Tally::default();

    merge_items(base, local, remote, &mut merged, &mut tally);
    merge_environments(base, local, remote, &mut merged, &mut tally);
    merged.active_environment_id = resolve_active_environment(&merged.environments, local, remote);

    debug!(
        "Merged collection '{}': {} auto-merged, {} unchanged, {} conflicts",
        merged.name,
        tally.auto_merged,
        tally.unchanged,
        tally.conflicts.len()
    );

    MergeResult {
        merged,
        conflicts: tally.conflicts,
        auto_merged_count: tally.auto_merged,
        unchanged_count: tally.unchanged,
    }
}

fn index_items(items: &[CollectionItem]) -> HashMap<ItemId, &CollectionItem> {
    fn walk<'a>(items: &'a [CollectionItem], index: &mut HashMap<ItemId, &'a CollectionItem>) {
        for item in items {
            index.insert(item.id().clone(), item);
            walk(item.children(), index);
        }
    }

    let mut index = HashMap::new();
    walk(items, &mut index);
    index
}

/// Union of ids: local pre-order, then remote-only, then base-only.
///
/// Remote pre-order guarantees a remote-only folder is placed before its
/// remote-only children are.
fn union_ids(sides: [Vec<ItemId>; 3]) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    sides
        .into_iter()
        .flatten()
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn merge_items(
    base: &Collection,
    local: &Collection,
    remote: &Collection,
    merged: &mut Collection,
    tally: &mut Tally,
) {
    let base_index = index_items(&base.items);
    let local_index = index_items(&local.items);
    let remote_index = index_items(&remote.items);
    let ids = union_ids([
        tree::collect_ids(&local.items),
        tree::collect_ids(&remote.items),
        tree::collect_ids(&base.items),
    ]);

    // Deletions are applied last so that children of a deleted folder can
    // still be placed, then spliced into the folder's position.
    let mut doomed = HashSet::new();

    for id in ids {
        let base_item = base_index.get(&id).copied();
        let local_item = local_index.get(&id).copied();
        let remote_item = remote_index.get(&id).copied();

        let decision = classify(base_item, local_item, remote_item, CollectionItem::content_eq);
        tally.record(decision);

        match decision {
            Decision::AddRemote => {
                if let Some(remote_item) = remote_item {
                    add_remote_item(&id, remote_item, remote, merged);
                }
            }
            Decision::TakeRemote => {
                if let Some(remote_item) = remote_item {
                    merged.items = tree::replace_fields(&merged.items, &id, remote_item);
                }
            }
            Decision::AcceptRemoteDelete => {
                doomed.insert(id);
            }
            Decision::Conflict(conflict_type) => {
                let path = [&local.items, &remote.items, &base.items]
                    .into_iter()
                    .map(|items| tree::path_to(items, &id))
                    .find(|path| !path.is_empty())
                    .unwrap_or_default();
                debug!("Item conflict ({}) on {}", conflict_type.label(), id);
                tally.conflicts.push(ItemConflict {
                    id,
                    conflict_type,
                    item_type: EntityKind::Item,
                    path,
                    base_version: base_item.cloned().map(EntityVersion::Item),
                    local_version: local_item.cloned().map(EntityVersion::Item),
                    remote_version: remote_item.cloned().map(EntityVersion::Item),
                });
            }
            Decision::Unchanged
            | Decision::KeepLocal
            | Decision::Identical
            | Decision::AcceptLocalDelete
            | Decision::BothDeleted => {}
        }
    }

    if !doomed.is_empty() {
        merged.items = tree::remove_splicing(&merged.items, &doomed);
    }
}

fn add_remote_item(
    id: &ItemId,
    remote_item: &CollectionItem,
    remote: &Collection,
    merged: &mut Collection,
) {
    let remote_parent = tree::parent_id_of(&remote.items, id);
    let parent = remote_parent
        .clone()
        .filter(|parent| tree::find_by_id(&merged.items, parent).is_some_and(CollectionItem::is_folder));
    if let (Some(missing), None) = (&remote_parent, &parent) {
        warn!(
            "Parent folder {} of remote item {} is missing locally; appending at root",
            missing, id
        );
    }

    merged.items = tree::insert_under(&merged.items, parent.as_ref(), remote_item.without_children());
}

fn merge_environments(
    base: &Collection,
    local: &Collection,
    remote: &Collection,
    merged: &mut Collection,
    tally: &mut Tally,
) {
    let environment_ids = |environments: &[Environment]| {
        environments
            .iter()
            .map(|environment| environment.id.clone())
            .collect::<Vec<_>>()
    };
    let ids = union_ids([
        environment_ids(&local.environments),
        environment_ids(&remote.environments),
        environment_ids(&base.environments),
    ]);

    for id in ids {
        let base_env = find_environment(&base.environments, &id);
        let local_env = find_environment(&local.environments, &id);
        let remote_env = find_environment(&remote.environments, &id);

        let decision = classify(base_env, local_env, remote_env, |a, b| a == b);
        tally.record(decision);

        match decision {
            Decision::AddRemote => {
                if let Some(remote_env) = remote_env {
                    merged.environments.push(remote_env.clone());
                }
            }
            Decision::TakeRemote => {
                if let Some(remote_env) = remote_env {
                    for environment in &mut merged.environments {
                        if environment.id == id {
                            *environment = remote_env.clone();
                        }
                    }
                }
            }
            Decision::AcceptRemoteDelete => {
                merged.environments.retain(|environment| environment.id != id);
            }
            Decision::Conflict(conflict_type) => {
                let name = local_env
                    .or(remote_env)
                    .or(base_env)
                    .map(|environment| environment.name.clone())
                    .unwrap_or_default();
                debug!("Environment conflict ({}) on {}", conflict_type.label(), id);
                tally.conflicts.push(ItemConflict {
                    id,
                    conflict_type,
                    item_type: EntityKind::Environment,
                    path: vec![name],
                    base_version: base_env.cloned().map(EntityVersion::Environment),
                    local_version: local_env.cloned().map(EntityVersion::Environment),
                    remote_version: remote_env.cloned().map(EntityVersion::Environment),
                });
            }
            Decision::Unchanged
            | Decision::KeepLocal
            | Decision::Identical
            | Decision::AcceptLocalDelete
            | Decision::BothDeleted => {}
        }
    }
}

/// Local's active environment if it survived, else remote's, else the first one.
fn resolve_active_environment(
    merged: &[Environment],
    local: &Collection,
    remote: &Collection,
) -> Option<ItemId> {
    let survives = |id: &&ItemId| find_environment(merged, id).is_some();
    local
        .active_environment_id
        .as_ref()
        .filter(survives)
        .or_else(|| remote.active_environment_id.as_ref().filter(survives))
        .or_else(|| merged.first().map(|environment| &environment.id))
        .or(local.active_environment_id.as_ref())
        .cloned()
}
