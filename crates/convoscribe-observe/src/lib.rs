//! Observability setup for convoscribe.
//!
//! Library crates only emit `tracing` events; binaries call
//! [`tracing_setup::init_tracing`] once at startup to decide where they go.

pub mod tracing_setup;
