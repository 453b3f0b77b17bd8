//! Collection item model

use serde::{Deserialize, Serialize};

use super::ItemId;

/// A header, query parameter or form field row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl KeyValue {
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

const fn default_enabled() -> bool {
    true
}

/// Request body payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    /// MIME type sent as `Content-Type`
    pub content_type: String,
    /// Raw body text
    pub content: String,
}

/// A folder grouping other items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: ItemId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Headers inherited by every request in the folder
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub items: Vec<CollectionItem>,
}

/// An HTTP request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub id: ItemId,
    pub name: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub query: Vec<KeyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_response_script: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// A saved WebSocket connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSocketRequest {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    /// Requested subprotocols
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Message drafts kept with the connection
    #[serde(default)]
    pub saved_messages: Vec<String>,
}

/// A GraphQL request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

/// Discriminant of a [`CollectionItem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Folder,
    Request,
    Websocket,
    Graphql,
}

impl ItemKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Request => "request",
            Self::Websocket => "websocket",
            Self::Graphql => "graphql",
        }
    }
}

/// A node of the collection tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CollectionItem {
    Folder(Folder),
    Request(HttpRequest),
    Websocket(WebSocketRequest),
    Graphql(GraphqlRequest),
}

impl CollectionItem {
    /// Create an empty folder
    #[must_use]
    pub fn folder(name: impl Into<String>, items: Vec<Self>) -> Self {
        Self::Folder(Folder {
            id: ItemId::new(),
            name: name.into(),
            description: None,
            headers: Vec::new(),
            items,
        })
    }

    /// Create a GET request
    #[must_use]
    pub fn request(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Request(HttpRequest {
            id: ItemId::new(),
            name: name.into(),
            method: default_method(),
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            pre_request_script: None,
            post_response_script: None,
        })
    }

    #[must_use]
    pub const fn id(&self) -> &ItemId {
        match self {
            Self::Folder(folder) => &folder.id,
            Self::Request(request) => &request.id,
            Self::Websocket(socket) => &socket.id,
            Self::Graphql(graphql) => &graphql.id,
        }
    }

    pub fn set_id(&mut self, id: ItemId) {
        match self {
            Self::Folder(folder) => folder.id = id,
            Self::Request(request) => request.id = id,
            Self::Websocket(socket) => socket.id = id,
            Self::Graphql(graphql) => graphql.id = id,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Folder(folder) => &folder.name,
            Self::Request(request) => &request.name,
            Self::Websocket(socket) => &socket.name,
            Self::Graphql(graphql) => &graphql.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Self::Folder(folder) => folder.name = name,
            Self::Request(request) => request.name = name,
            Self::Websocket(socket) => socket.name = name,
            Self::Graphql(graphql) => graphql.name = name,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::Folder(_) => ItemKind::Folder,
            Self::Request(_) => ItemKind::Request,
            Self::Websocket(_) => ItemKind::Websocket,
            Self::Graphql(_) => ItemKind::Graphql,
        }
    }

    #[must_use]
    pub const fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    /// Child items; empty for leaf items.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Folder(folder) => &folder.items,
            _ => &[],
        }
    }

    /// Mutable child list, `None` for leaf items.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            Self::Folder(folder) => Some(&mut folder.items),
            _ => None,
        }
    }

    /// Compare the item's own fields, ignoring a folder's children.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Folder(a), Self::Folder(b)) => {
                a.id == b.id
                    && a.name == b.name
                    && a.description == b.description
                    && a.headers == b.headers
            }
            _ => self == other,
        }
    }

    /// Copy of this item with a folder's children dropped.
    #[must_use]
    pub fn without_children(&self) -> Self {
        self.clone().with_children(Vec::new())
    }

    /// Replace a folder's children; leaf items are returned unchanged.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        if let Some(items) = self.children_mut() {
            *items = children;
        }
        self
    }

    /// Deep copy with fresh ids for the item and every descendant, the
    /// item's own name suffixed with `suffix`.
    #[must_use]
    pub fn duplicate(&self, suffix: &str) -> Self {
        let mut copy = self.clone();
        copy.refresh_ids();
        let name = format!("{}{suffix}", copy.name());
        copy.set_name(name);
        copy
    }

    fn refresh_ids(&mut self) {
        self.set_id(ItemId::new());
        if let Some(children) = self.children_mut() {
            for child in children {
                child.refresh_ids();
            }
        }
    }
}
