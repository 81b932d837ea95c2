//! CLI command implementations

pub mod add;
pub mod category;
pub mod completions;
pub mod config;
pub mod init;
pub mod shelf;
pub mod tray;
pub mod tree;
pub mod warehouse;
