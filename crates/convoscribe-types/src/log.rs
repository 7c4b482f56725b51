//! Raw log input types.
//!
//! A `LogLine` is the immutable unit handed to the engine by the ingestion
//! loop. Its timestamp is supplied externally; the engine never parses
//! timestamps out of `raw_text`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One line of upstream pipeline telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Correlation id, if the caller already knows it.
    #[serde(default)]
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub raw_text: String,
}

impl LogLine {
    pub fn new(timestamp: DateTime<Utc>, raw_text: impl Into<String>) -> Self {
        Self {
            session_id: None,
            timestamp,
            raw_text: raw_text.into(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// One synthesized-speech line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsEvent {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TtsEvent {
    pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }
}

/// Shape of a raw line, as far as the engine is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// Carries a `context [...]` conversation dump.
    Context,
    /// Carries a `Generating TTS [...]` payload.
    Tts,
    Other,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Context => write!(f, "context"),
            LineKind::Tts => write!(f, "tts"),
            LineKind::Other => write!(f, "other"),
        }
    }
}
