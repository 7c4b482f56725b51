//! Infrastructure adapters for convoscribe.
//!
//! Everything that touches the filesystem lives here: loading `config.toml`
//! and reading timestamped log records into `LogLine`s for the engine.

pub mod config;
pub mod source;
