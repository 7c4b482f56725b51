//! Shared domain types for convoscribe.
//!
//! This crate contains the data model of the conversation reconstruction
//! engine: log lines, parsed context messages, TTS events, turns, session
//! phases, engine configuration, and the associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod log;
pub mod message;
