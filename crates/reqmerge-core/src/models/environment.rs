//! Environment model

use serde::{Deserialize, Serialize};

use super::ItemId;

/// A variable inside an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Secret values are masked by clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<bool>,
}

const fn default_enabled() -> bool {
    true
}

/// A named variable set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl Environment {
    /// Create an empty environment with a fresh id
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            variables: Vec::new(),
        }
    }

    /// Add a plain (non-secret) variable
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(Variable {
            key: key.into(),
            value: value.into(),
            enabled: true,
            secret: None,
        });
        self
    }

    /// Copy with a fresh id and the name suffixed with `suffix`
    #[must_use]
    pub fn duplicate(&self, suffix: &str) -> Self {
        Self {
            id: ItemId::new(),
            name: format!("{}{suffix}", self.name),
            variables: self.variables.clone(),
        }
    }
}

/// Find an environment by id
pub fn find_environment<'a>(environments: &'a [Environment], id: &ItemId) -> Option<&'a Environment> {
    environments.iter().find(|environment| &environment.id == id)
}
