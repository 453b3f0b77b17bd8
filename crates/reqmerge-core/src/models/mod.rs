//! Data models for reqmerge

mod collection;
mod environment;
mod id;
mod item;

pub use collection::Collection;
pub use environment::{find_environment, Environment, Variable};
pub use id::ItemId;
pub use item::{
    CollectionItem, Folder, GraphqlRequest, HttpRequest, ItemKind, KeyValue, RequestBody,
    WebSocketRequest,
};
