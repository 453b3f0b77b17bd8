//! Merge result and conflict records

use serde::{Deserialize, Serialize};

use crate::models::{Collection, CollectionItem, Environment, ItemId};

/// How the two sides diverged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    /// Both sides changed (or both added) the entity differently
    Update,
    /// Deleted locally, changed remotely
    DeleteLocal,
    /// Deleted remotely, changed locally
    DeleteRemote,
}

impl ConflictType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::DeleteLocal => "delete-local",
            Self::DeleteRemote => "delete-remote",
        }
    }
}

/// Which list the conflicting entity lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Item,
    Environment,
}

/// One side's copy of a conflicting entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityVersion {
    Item(CollectionItem),
    Environment(Environment),
}

impl EntityVersion {
    pub fn name(&self) -> &str {
        match self {
            Self::Item(item) => item.name(),
            Self::Environment(environment) => &environment.name,
        }
    }

    pub const fn as_item(&self) -> Option<&CollectionItem> {
        match self {
            Self::Item(item) => Some(item),
            Self::Environment(_) => None,
        }
    }

    pub const fn as_environment(&self) -> Option<&Environment> {
        match self {
            Self::Environment(environment) => Some(environment),
            Self::Item(_) => None,
        }
    }
}

/// A divergence the engine could not merge on its own.
///
/// Keyed by the entity's own id, one conflict per entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConflict {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub item_type: EntityKind,
    /// Display breadcrumb, entity name last
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<EntityVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_version: Option<EntityVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_version: Option<EntityVersion>,
}

impl ItemConflict {
    /// Name shown to users: the last path segment
    pub fn display_name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

/// Output of a three-way merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    /// Local collection with every automatic change applied
    pub merged: Collection,
    pub conflicts: Vec<ItemConflict>,
    /// Ids whose change was merged without user input
    pub auto_merged_count: usize,
    /// Ids present and unchanged on all three sides
    #[serde(default)]
    pub unchanged_count: usize,
}

impl MergeResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// Conflicts recorded for `id`
    pub fn conflicts_for<'a>(&'a self, id: &'a ItemId) -> impl Iterator<Item = &'a ItemConflict> {
        self.conflicts.iter().filter(move |conflict| &conflict.id == id)
    }

    pub fn from_json(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_conflict_json_shape() {
        let item = CollectionItem::request("Get Users", "https://example.com/users");
        let conflict = ItemConflict {
            id: item.id().clone(),
            conflict_type: ConflictType::DeleteLocal,
            item_type: EntityKind::Item,
            path: vec!["Users".to_string(), "Get Users".to_string()],
            base_version: None,
            local_version: None,
            remote_version: Some(EntityVersion::Item(item)),
        };

        let value = serde_json::to_value(&conflict).unwrap();
        assert_eq!(value["type"], "delete-local");
        assert_eq!(value["itemType"], "item");
        assert_eq!(value["remoteVersion"]["type"], "request");
        assert!(value.get("baseVersion").is_none());

        let parsed: ItemConflict = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, conflict);
        assert_eq!(parsed.display_name(), "Get Users");
    }

    #[test]
    fn test_environment_version_parses_untagged() {
        let environment = Environment::new("Dev").with_variable("host", "localhost");
        let json = serde_json::to_string(&EntityVersion::Environment(environment.clone())).unwrap();
        let parsed: EntityVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_environment(), Some(&environment));
    }
}
