//! Collection document model

use serde::{Deserialize, Serialize};

use super::{CollectionItem, Environment, ItemId};
use crate::Result;

/// A collection document: an item forest plus its environments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub name: String,
    /// Opaque document version owned by the persistence layer
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub environments: Vec<Environment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_environment_id: Option<ItemId>,
    #[serde(default)]
    pub items: Vec<CollectionItem>,
}

impl Collection {
    /// Create an empty collection
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style helper appending a root item
    #[must_use]
    pub fn with_item(mut self, item: CollectionItem) -> Self {
        self.items.push(item);
        self
    }

    /// Builder-style helper appending an environment
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environments.push(environment);
        self
    }

    /// Parse a collection document
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Render the collection as pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
