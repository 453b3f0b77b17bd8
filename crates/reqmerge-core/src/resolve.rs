//! Applying user conflict resolutions to a merge result.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::merge::{ConflictType, EntityKind, EntityVersion, ItemConflict, MergeResult};
use crate::models::{Collection, CollectionItem, Environment, ItemId};
use crate::tree;

/// Name suffix given to the remote copy kept by [`ResolutionChoice::KeepBoth`].
pub const DUPLICATE_SUFFIX: &str = " (server)";

/// A user's decision for one conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionChoice {
    KeepLocal,
    KeepRemote,
    /// Only valid for `update` conflicts
    KeepBoth,
}

impl ResolutionChoice {
    pub const fn label(self) -> &'static str {
        match self {
            Self::KeepLocal => "keep-local",
            Self::KeepRemote => "keep-remote",
            Self::KeepBoth => "keep-both",
        }
    }

    /// Whether this choice can resolve a conflict of `conflict_type`.
    pub const fn applies_to(self, conflict_type: ConflictType) -> bool {
        !matches!(
            (self, conflict_type),
            (Self::KeepBoth, ConflictType::DeleteLocal | ConflictType::DeleteRemote)
        )
    }
}

/// Resolution of the conflict keyed by `conflict_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictResolution {
    pub conflict_id: ItemId,
    pub choice: ResolutionChoice,
}

impl ConflictResolution {
    pub fn new(conflict_id: impl Into<ItemId>, choice: ResolutionChoice) -> Self {
        Self {
            conflict_id: conflict_id.into(),
            choice,
        }
    }
}

/// Resolve every conflict in `result` with `choice`.
///
/// `keep-both` falls back to `keep-local` for delete conflicts.
pub fn resolve_all(result: &MergeResult, choice: ResolutionChoice) -> Vec<ConflictResolution> {
    result
        .conflicts
        .iter()
        .map(|conflict| {
            let choice = if choice.applies_to(conflict.conflict_type) {
                choice
            } else {
                ResolutionChoice::KeepLocal
            };
            ConflictResolution::new(conflict.id.clone(), choice)
        })
        .collect()
}

/// Check that every resolution targets a conflict in `result` with a valid choice.
pub fn validate_resolutions(result: &MergeResult, resolutions: &[ConflictResolution]) -> Result<()> {
    let mut seen = HashSet::new();
    for resolution in resolutions {
        if !seen.insert(&resolution.conflict_id) {
            return Err(Error::InvalidResolution(format!(
                "conflict {} is resolved more than once",
                resolution.conflict_id
            )));
        }

        let mut conflicts = result.conflicts_for(&resolution.conflict_id).peekable();
        if conflicts.peek().is_none() {
            return Err(Error::InvalidResolution(format!(
                "no conflict with id {}",
                resolution.conflict_id
            )));
        }
        if let Some(conflict) =
            conflicts.find(|conflict| !resolution.choice.applies_to(conflict.conflict_type))
        {
            return Err(Error::InvalidResolution(format!(
                "{} cannot resolve a {} conflict ({})",
                resolution.choice.label(),
                conflict.conflict_type.label(),
                conflict.id
            )));
        }
    }
    Ok(())
}

/// Apply `resolutions` to the merged collection of `result`.
///
/// Resolutions naming no conflict, and choices a conflict does not accept,
/// are ignored. Never fails.
///
/// An item restored by `keep-remote` on a `delete-local` conflict goes back
/// under its recorded folder path, matched by folder *name*: with two
/// sibling folders of the same name the first one receives it, and when no
/// folder on the path exists anymore it is appended at the root.
pub fn apply(result: &MergeResult, resolutions: &[ConflictResolution]) -> Collection {
    apply_with_suffix(result, resolutions, DUPLICATE_SUFFIX)
}

/// [`apply`] with a custom name suffix for duplicated remote copies.
pub fn apply_with_suffix(
    result: &MergeResult,
    resolutions: &[ConflictResolution],
    suffix: &str,
) -> Collection {
    let mut collection = result.merged.clone();
    let mut environments_touched = false;

    for resolution in resolutions {
        let mut matched = false;
        for conflict in result.conflicts_for(&resolution.conflict_id) {
            matched = true;
            if !resolution.choice.applies_to(conflict.conflict_type) {
                warn!(
                    "Ignoring {} for {} conflict on {}",
                    resolution.choice.label(),
                    conflict.conflict_type.label(),
                    conflict.id
                );
                continue;
            }
            match conflict.item_type {
                EntityKind::Item => {
                    collection.items =
                        apply_to_items(&collection.items, conflict, resolution.choice, suffix);
                }
                EntityKind::Environment => {
                    apply_to_environments(
                        &mut collection.environments,
                        conflict,
                        resolution.choice,
                        suffix,
                    );
                    environments_touched = true;
                }
            }
        }
        if !matched {
            debug!(
                "Ignoring resolution for unknown conflict {}",
                resolution.conflict_id
            );
        }
    }

    if environments_touched {
        let active_survives = collection
            .active_environment_id
            .as_ref()
            .is_some_and(|id| collection.environments.iter().any(|env| &env.id == id));
        if !active_survives {
            if let Some(first) = collection.environments.first() {
                collection.active_environment_id = Some(first.id.clone());
            }
        }
    }

    collection
}

fn apply_to_items(
    items: &[CollectionItem],
    conflict: &ItemConflict,
    choice: ResolutionChoice,
    suffix: &str,
) -> Vec<CollectionItem> {
    let remote = conflict
        .remote_version
        .as_ref()
        .and_then(EntityVersion::as_item);
    let id = &conflict.id;

    match (conflict.conflict_type, choice) {
        (ConflictType::Update, ResolutionChoice::KeepRemote) => match remote {
            Some(remote) => tree::replace_fields(items, id, remote),
            None => items.to_vec(),
        },
        (ConflictType::Update, ResolutionChoice::KeepBoth) => match remote {
            Some(remote) => tree::insert_after(items, id, remote.duplicate(suffix)),
            None => items.to_vec(),
        },
        (ConflictType::DeleteLocal, ResolutionChoice::KeepLocal)
        | (ConflictType::DeleteRemote, ResolutionChoice::KeepRemote) => {
            tree::remove_splicing(items, &HashSet::from([id.clone()]))
        }
        (ConflictType::DeleteLocal, ResolutionChoice::KeepRemote) => match remote {
            Some(remote) => restore_item(items, conflict, remote),
            None => items.to_vec(),
        },
        (ConflictType::Update | ConflictType::DeleteRemote, ResolutionChoice::KeepLocal)
        | (_, ResolutionChoice::KeepBoth) => items.to_vec(),
    }
}

/// Put a locally deleted item back where the remote breadcrumb says it lives.
fn restore_item(
    items: &[CollectionItem],
    conflict: &ItemConflict,
    remote: &CollectionItem,
) -> Vec<CollectionItem> {
    if tree::contains(items, &conflict.id) {
        return tree::replace_fields(items, &conflict.id, remote);
    }

    let present = tree::collect_id_set(items);
    let restored = without_present(remote, &present);
    let parent_path = &conflict.path[..conflict.path.len().saturating_sub(1)];

    match tree::try_insert_at_path(items, parent_path, restored.clone()) {
        Some(placed) => placed,
        None => {
            warn!(
                "Folder path {:?} for restored item {} not found; appending at root",
                parent_path, conflict.id
            );
            tree::insert_under(items, None, restored)
        }
    }
}

/// Copy of `item` without descendants whose ids are already in `present`.
fn without_present(item: &CollectionItem, present: &HashSet<ItemId>) -> CollectionItem {
    let children = item
        .children()
        .iter()
        .filter(|child| !present.contains(child.id()))
        .map(|child| without_present(child, present))
        .collect();
    item.without_children().with_children(children)
}

fn apply_to_environments(
    environments: &mut Vec<Environment>,
    conflict: &ItemConflict,
    choice: ResolutionChoice,
    suffix: &str,
) {
    let remote = conflict
        .remote_version
        .as_ref()
        .and_then(EntityVersion::as_environment);
    let id = &conflict.id;

    match (conflict.conflict_type, choice) {
        (ConflictType::Update | ConflictType::DeleteLocal, ResolutionChoice::KeepRemote) => {
            let Some(remote) = remote else { return };
            if let Some(slot) = environments.iter_mut().find(|env| &env.id == id) {
                *slot = remote.clone();
            } else {
                environments.push(remote.clone());
            }
        }
        (ConflictType::Update, ResolutionChoice::KeepBoth) => {
            if let Some(remote) = remote {
                environments.push(remote.duplicate(suffix));
            }
        }
        (ConflictType::DeleteLocal, ResolutionChoice::KeepLocal)
        | (ConflictType::DeleteRemote, ResolutionChoice::KeepRemote) => {
            environments.retain(|env| &env.id != id);
        }
        (ConflictType::Update | ConflictType::DeleteRemote, ResolutionChoice::KeepLocal)
        | (_, ResolutionChoice::KeepBoth) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;
    use pretty_assertions::assert_eq;

    fn req(id: &str, name: &str) -> CollectionItem {
        let mut item = CollectionItem::request(name, format!("https://api.example.com/{id}"));
        item.set_id(ItemId::from(id));
        item
    }

    fn folder(id: &str, name: &str, items: Vec<CollectionItem>) -> CollectionItem {
        let mut item = CollectionItem::folder(name, items);
        item.set_id(ItemId::from(id));
        item
    }

    fn env(id: &str, name: &str) -> Environment {
        let mut environment = Environment::new(name);
        environment.id = ItemId::from(id);
        environment
    }

    fn collection(items: Vec<CollectionItem>) -> Collection {
        Collection {
            name: "API".to_string(),
            items,
            ..Collection::default()
        }
    }

    fn names(items: &[CollectionItem]) -> Vec<String> {
        items.iter().map(|item| item.name().to_string()).collect()
    }

    fn rename_conflict() -> MergeResult {
        let base = collection(vec![req("a", "A"), req("z", "Z")]);
        let local = collection(vec![req("a", "Foo"), req("z", "Z")]);
        let remote = collection(vec![req("a", "Bar"), req("z", "Z")]);
        merge(&base, &local, &remote)
    }

    #[test]
    fn test_empty_resolution_list_returns_merged() {
        let result = rename_conflict();
        assert_eq!(apply(&result, &[]), result.merged);
    }

    #[test]
    fn test_keep_local_on_update_is_noop() {
        let result = rename_conflict();
        let resolved = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepLocal)]);
        assert_eq!(names(&resolved.items), vec!["Foo", "Z"]);
    }

    #[test]
    fn test_keep_remote_on_update_replaces_item() {
        let result = rename_conflict();
        let resolved = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepRemote)]);
        assert_eq!(resolved.items, vec![req("a", "Bar"), req("z", "Z")]);
    }

    #[test]
    fn test_keep_both_inserts_server_copy_after_local() {
        let result = rename_conflict();
        let resolved = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepBoth)]);

        assert_eq!(names(&resolved.items), vec!["Foo", "Bar (server)", "Z"]);
        assert_eq!(resolved.items[0].id(), &ItemId::from("a"));
        assert_ne!(resolved.items[1].id(), &ItemId::from("a"));
        assert_ne!(resolved.items[1].id(), &ItemId::from("z"));
    }

    #[test]
    fn test_keep_remote_restores_locally_deleted_item_by_folder_name() {
        let base = collection(vec![folder("users", "Users", vec![req("a", "A")])]);
        let local = collection(vec![folder("users", "Users", Vec::new())]);
        let remote = collection(vec![folder("users", "Users", vec![req("a", "A v2")])]);
        let result = merge(&base, &local, &remote);
        assert_eq!(result.conflicts[0].conflict_type, ConflictType::DeleteLocal);

        let resolved = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepRemote)]);
        assert_eq!(resolved.items, remote.items);

        let confirmed = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepLocal)]);
        assert_eq!(confirmed.items, local.items);
    }

    #[test]
    fn test_restore_without_matching_folder_appends_at_root() {
        let base = collection(vec![folder("users", "Users", vec![req("a", "A")])]);
        let local = collection(Vec::new());
        let remote = collection(vec![folder("users", "Users", vec![req("a", "A v2")])]);
        let result = merge(&base, &local, &remote);
        // Folder unchanged remotely: its delete is accepted, the edited child conflicts.
        assert_eq!(result.conflicts.len(), 1);

        let resolved = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepRemote)]);
        assert_eq!(resolved.items, vec![req("a", "A v2")]);
    }

    #[test]
    fn test_restoring_folder_skips_children_already_present() {
        let base = collection(vec![folder("f", "F", vec![req("a", "A"), req("b", "B")])]);
        let local = collection(Vec::new());
        let remote = collection(vec![folder(
            "f",
            "F renamed",
            vec![req("a", "A v2"), req("b", "B")],
        )]);
        let result = merge(&base, &local, &remote);
        let mut conflicted: Vec<&str> = result.conflicts.iter().map(|c| c.id.as_str()).collect();
        conflicted.sort_unstable();
        assert_eq!(conflicted, vec!["a", "f"]);

        // Child first (lands at root), then the folder restore must not duplicate it.
        let resolved = apply(
            &result,
            &[
                ConflictResolution::new("a", ResolutionChoice::KeepRemote),
                ConflictResolution::new("f", ResolutionChoice::KeepRemote),
            ],
        );
        let ids = tree::collect_ids(&resolved.items);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), unique.len());
        assert!(tree::contains(&resolved.items, &ItemId::from("f")));
        assert!(tree::contains(&resolved.items, &ItemId::from("a")));
        assert!(tree::contains(&resolved.items, &ItemId::from("b")));
    }

    #[test]
    fn test_delete_remote_choices() {
        let base = collection(vec![req("a", "A")]);
        let local = collection(vec![req("a", "A edited")]);
        let remote = collection(Vec::new());
        let result = merge(&base, &local, &remote);

        let kept = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepLocal)]);
        assert_eq!(kept.items, vec![req("a", "A edited")]);

        let deleted = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepRemote)]);
        assert!(deleted.items.is_empty());
    }

    #[test]
    fn test_keep_both_on_delete_conflict_is_ignored() {
        let base = collection(vec![req("a", "A")]);
        let local = collection(vec![req("a", "A edited")]);
        let result = merge(&base, &local, &collection(Vec::new()));

        let resolved = apply(&result, &[ConflictResolution::new("a", ResolutionChoice::KeepBoth)]);
        assert_eq!(resolved, result.merged);
    }

    #[test]
    fn test_unknown_conflict_ids_are_ignored() {
        let result = rename_conflict();
        let resolved = apply(
            &result,
            &[ConflictResolution::new("nope", ResolutionChoice::KeepRemote)],
        );
        assert_eq!(resolved, result.merged);
    }

    #[test]
    fn test_environment_resolutions() {
        let mut base = collection(Vec::new());
        base.environments = vec![env("dev", "Dev"), env("qa", "QA")];
        let mut local = base.clone();
        local.environments = vec![env("dev", "Dev local")];
        local.active_environment_id = Some(ItemId::from("dev"));
        let mut remote = base.clone();
        remote.environments = vec![env("dev", "Dev remote"), env("qa", "QA remote")];
        let result = merge(&base, &local, &remote);
        assert_eq!(result.conflicts.len(), 2);

        let both = apply(
            &result,
            &[
                ConflictResolution::new("dev", ResolutionChoice::KeepBoth),
                ConflictResolution::new("qa", ResolutionChoice::KeepRemote),
            ],
        );
        let env_names: Vec<&str> = both.environments.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(env_names, vec!["Dev local", "QA remote", "Dev remote (server)"]);
        assert_eq!(both.active_environment_id, Some(ItemId::from("dev")));

        let confirmed = apply(
            &result,
            &[ConflictResolution::new("qa", ResolutionChoice::KeepLocal)],
        );
        assert_eq!(confirmed.environments, vec![env("dev", "Dev local")]);
    }

    #[test]
    fn test_removing_active_environment_picks_first_survivor() {
        let mut base = collection(Vec::new());
        base.environments = vec![env("dev", "Dev"), env("qa", "QA")];
        let mut local = base.clone();
        local.environments = vec![env("dev", "Dev"), env("qa", "QA local")];
        local.active_environment_id = Some(ItemId::from("qa"));
        let mut remote = base.clone();
        remote.environments = vec![env("dev", "Dev")];
        let result = merge(&base, &local, &remote);
        assert_eq!(result.merged.active_environment_id, Some(ItemId::from("qa")));

        let resolved = apply(&result, &[ConflictResolution::new("qa", ResolutionChoice::KeepRemote)]);
        assert_eq!(resolved.active_environment_id, Some(ItemId::from("dev")));
    }

    #[test]
    fn test_resolve_all_downgrades_keep_both_on_deletes() {
        let base = collection(vec![req("a", "A"), req("b", "B")]);
        let local = collection(vec![req("a", "A local"), req("b", "B local")]);
        let remote = collection(vec![req("a", "A remote")]);
        let result = merge(&base, &local, &remote);

        let resolutions = resolve_all(&result, ResolutionChoice::KeepBoth);
        assert_eq!(
            resolutions,
            vec![
                ConflictResolution::new("a", ResolutionChoice::KeepBoth),
                ConflictResolution::new("b", ResolutionChoice::KeepLocal),
            ]
        );
        assert!(validate_resolutions(&result, &resolutions).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_duplicate_and_invalid_choices() {
        let base = collection(vec![req("a", "A"), req("b", "B")]);
        let local = collection(vec![req("a", "A local"), req("b", "B local")]);
        let remote = collection(vec![req("a", "A remote")]);
        let result = merge(&base, &local, &remote);

        let unknown = validate_resolutions(
            &result,
            &[ConflictResolution::new("zzz", ResolutionChoice::KeepLocal)],
        );
        assert!(unknown.unwrap_err().to_string().contains("no conflict"));

        let twice = validate_resolutions(
            &result,
            &[
                ConflictResolution::new("a", ResolutionChoice::KeepLocal),
                ConflictResolution::new("a", ResolutionChoice::KeepRemote),
            ],
        );
        assert!(twice.unwrap_err().to_string().contains("more than once"));

        let invalid = validate_resolutions(
            &result,
            &[ConflictResolution::new("b", ResolutionChoice::KeepBoth)],
        );
        assert!(invalid.unwrap_err().to_string().contains("delete-remote"));
    }

    #[test]
    fn test_resolution_json_shape() {
        let resolution = ConflictResolution::new("a", ResolutionChoice::KeepBoth);
        let json = serde_json::to_string(&resolution).unwrap();
        assert_eq!(json, r#"{"conflictId":"a","choice":"keep-both"}"#);
    }
}
