//! Conversation reconstruction engine for convoscribe.
//!
//! Turns raw voice-pipeline telemetry into ordered conversation turns. This
//! crate performs no I/O and spawns nothing: an external ingestion loop feeds
//! it lines and decides when to finalize a session. It depends only on
//! `convoscribe-types` -- never on `convoscribe-infra`.

pub mod conversation;
pub mod extract;
pub mod session;
