//! Per-session state, storage, and the delayed reply merge.

pub mod accumulator;
pub mod reconciler;
pub mod store;

pub use accumulator::{MergeOutcome, SessionAccumulator};
pub use reconciler::{IgnoreReason, IngestOutcome, SessionReconciler};
pub use store::{InMemorySessionStore, SessionStore};
