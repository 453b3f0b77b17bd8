//! Storage backends for remote collections.

mod file;

pub use file::JsonFileRemote;
