//! Context snapshots, reconstructed turns, and session phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::message::ParsedMessage;

/// Full conversation history as of one context-dump line.
///
/// A newer snapshot replaces, never merges with, the prior one for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub turns: Vec<ParsedMessage>,
    pub captured_at: DateTime<Utc>,
}

impl ContextSnapshot {
    pub fn new(turns: Vec<ParsedMessage>, captured_at: DateTime<Utc>) -> Self {
        Self { turns, captured_at }
    }
}

/// One user utterance paired with at most one assistant reply.
///
/// `turn_id` is contiguous from 1 within a session's emitted turn list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: u32,
    pub user_message: String,
    pub assistant_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Merge lifecycle of a session accumulator.
///
/// `Empty -> AwaitingMerge` on the first context snapshot, any later snapshot
/// resets to `AwaitingMerge`, and `finalize` moves `AwaitingMerge -> Merged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Empty,
    AwaitingMerge,
    Merged,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Empty => write!(f, "empty"),
            SessionPhase::AwaitingMerge => write!(f, "awaiting_merge"),
            SessionPhase::Merged => write!(f, "merged"),
        }
    }
}

impl FromStr for SessionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "empty" => Ok(SessionPhase::Empty),
            "awaiting_merge" => Ok(SessionPhase::AwaitingMerge),
            "merged" => Ok(SessionPhase::Merged),
            other => Err(format!("invalid session phase: '{other}'")),
        }
    }
}
