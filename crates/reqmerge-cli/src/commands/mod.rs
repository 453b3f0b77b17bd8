pub mod common;
pub mod completions;
pub mod config;
pub mod merge;
pub mod publish;
pub mod pull;
pub mod push;
pub mod resolve;
