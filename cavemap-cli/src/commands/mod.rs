//! CLI subcommands.

pub mod cache;
pub mod common;
pub mod decode;
pub mod fetch;
pub mod grid;
pub mod import;
pub mod init;
pub mod project;
