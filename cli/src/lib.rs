//! Command-line front end for indexing, searching and assembling context
//! from a local project.

pub mod codebase_cmd;
pub mod config;

pub use codebase_cmd::CodebaseCli;
pub use config::CliConfig;
