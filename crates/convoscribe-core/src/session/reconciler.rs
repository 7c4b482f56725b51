//! Session merge reconciler.
//!
//! Routes context snapshots and TTS events into per-session accumulators and
//! performs the delayed, at-most-once assistant-reply merge on `finalize`.
//!
//! Lines for one session must arrive in non-decreasing timestamp order. The
//! reconciler relies on that ordering and does not repair it. Deciding when a
//! session is done (idle timeout, end-of-call signal) belongs to the caller,
//! which then invokes [`SessionReconciler::finalize`] and, when memory must be
//! bounded, [`SessionReconciler::evict_expired`].

use chrono::{DateTime, Utc};
use convoscribe_types::config::EngineConfig;
use convoscribe_types::conversation::{ContextSnapshot, SessionPhase, Turn};
use convoscribe_types::log::{LineKind, LogLine, TtsEvent};
use std::fmt;
use tracing::{debug, info, warn};

use super::accumulator::{MergeOutcome, SessionAccumulator};
use super::store::SessionStore;
use crate::extract::{classify_line, extract_session_id, parse_context_log, parse_tts_log};

/// What `ingest_line` did with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Context { session_id: String, messages: usize },
    Tts { session_id: String },
    Ignored(IgnoreReason),
}

/// Why a line changed no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoSessionId,
    UnrecognizedShape,
    EmptyContext,
    EmptyTts,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::NoSessionId => write!(f, "no session id"),
            IgnoreReason::UnrecognizedShape => write!(f, "unrecognized line shape"),
            IgnoreReason::EmptyContext => write!(f, "context dump without messages"),
            IgnoreReason::EmptyTts => write!(f, "blank tts text"),
        }
    }
}

/// Owns the merge policy over an injected session store.
///
/// Generic over `SessionStore`; pass `&store` or `Arc<store>` to share a
/// store the caller keeps.
pub struct SessionReconciler<S: SessionStore> {
    store: S,
    config: EngineConfig,
}

impl<S: SessionStore> SessionReconciler<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Ingestion ---

    /// Replace the session's latest context with `snapshot`.
    ///
    /// Resets the session to `AwaitingMerge`. TTS events at or before the
    /// snapshot's capture time are discarded and can no longer merge.
    pub fn ingest_context(&self, session_id: &str, snapshot: ContextSnapshot) {
        let captured_at = snapshot.captured_at;
        let messages = snapshot.turns.len();
        let (previous, discarded, turns) =
            self.store.with_session(session_id, captured_at, |acc| {
                let previous = acc.phase();
                let discarded = acc.apply_context(snapshot);
                (previous, discarded, acc.turns().len())
            });

        if discarded > 0 && previous == SessionPhase::AwaitingMerge {
            warn!(
                session_id = %session_id,
                discarded,
                "Newer context superseded unmerged TTS events; they will not be merged"
            );
        } else if discarded > 0 {
            debug!(session_id = %session_id, discarded, "Dropped TTS events preceding context");
        }
        debug!(
            session_id = %session_id,
            messages,
            turns,
            previous_phase = %previous,
            "Context snapshot ingested"
        );
    }

    /// Buffer a synthesized-speech event for the session.
    ///
    /// Blank text carries nothing to merge and is ignored.
    pub fn ingest_tts(&self, session_id: &str, event: TtsEvent) {
        if event.text.trim().is_empty() {
            debug!(session_id = %session_id, "Ignoring blank TTS event");
            return;
        }
        let max_pending = self.config.max_pending_tts;
        let overflowed = self
            .store
            .with_session(session_id, event.timestamp, |acc| acc.push_tts(event, max_pending));
        if overflowed {
            warn!(
                session_id = %session_id,
                max_pending,
                "Pending TTS buffer full; dropped oldest event"
            );
        }
    }

    /// Route one raw line: resolve its session, classify, parse, ingest.
    ///
    /// Uses the line's own `session_id` when present, otherwise the first
    /// UUID in its text.
    pub fn ingest_line(&self, line: &LogLine) -> IngestOutcome {
        let session_id = match line
            .session_id
            .clone()
            .or_else(|| extract_session_id(&line.raw_text))
        {
            Some(id) => id,
            None => return IngestOutcome::Ignored(IgnoreReason::NoSessionId),
        };

        match classify_line(&line.raw_text) {
            LineKind::Context => {
                let messages = parse_context_log(&line.raw_text);
                if messages.is_empty() {
                    debug!(session_id = %session_id, "Context line yielded no messages");
                    return IngestOutcome::Ignored(IgnoreReason::EmptyContext);
                }
                let count = messages.len();
                self.ingest_context(&session_id, ContextSnapshot::new(messages, line.timestamp));
                IngestOutcome::Context {
                    session_id,
                    messages: count,
                }
            }
            LineKind::Tts => match parse_tts_log(&line.raw_text) {
                Some(text) if !text.is_empty() => {
                    self.ingest_tts(&session_id, TtsEvent::new(text, line.timestamp));
                    IngestOutcome::Tts { session_id }
                }
                _ => IngestOutcome::Ignored(IgnoreReason::EmptyTts),
            },
            LineKind::Other => IngestOutcome::Ignored(IgnoreReason::UnrecognizedShape),
        }
    }

    // --- Finalization ---

    /// Merge pending speech into the last turn and return the session's turns.
    ///
    /// Returns an empty list when the session is unknown or has no context
    /// yet. Calling it again without new input returns the same turns.
    #[tracing::instrument(name = "finalize_session", skip_all, fields(session_id = %session_id))]
    pub fn finalize(&self, session_id: &str) -> Vec<Turn> {
        let Some((outcome, turns)) = self.store.with_existing(session_id, |acc| {
            let outcome = acc.merge();
            (outcome, acc.turns().to_vec())
        }) else {
            debug!("Finalize requested for unknown session");
            return Vec::new();
        };

        match outcome {
            MergeOutcome::Merged { turn_id, events } => {
                info!(turn_id, events, turns = turns.len(), "Merged TTS reply into last turn");
            }
            other => debug!(outcome = %other, turns = turns.len(), "Finalize without merge"),
        }
        turns
    }

    // --- Inspection ---

    pub fn phase(&self, session_id: &str) -> Option<SessionPhase> {
        self.store.with_existing(session_id, |acc| acc.phase())
    }

    /// Current turns without attempting a merge.
    pub fn turns(&self, session_id: &str) -> Vec<Turn> {
        self.store
            .with_existing(session_id, |acc| acc.turns().to_vec())
            .unwrap_or_default()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.store.session_ids()
    }

    // --- Eviction ---

    /// Drop a session's state, returning it.
    pub fn evict(&self, session_id: &str) -> Option<SessionAccumulator> {
        let evicted = self.store.remove(session_id);
        if evicted.is_some() {
            debug!(session_id = %session_id, "Session evicted");
        }
        evicted
    }

    /// Evict every session that exceeds the configured policy at `now`.
    ///
    /// Returns the evicted ids, sorted. This is a hook: nothing here runs on
    /// a timer.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let policy = self.config.eviction;
        let evicted: Vec<String> = self
            .store
            .session_ids()
            .into_iter()
            .filter(|id| {
                self.store
                    .remove_if(id, |acc| acc.is_expired(&policy, now))
                    .is_some()
            })
            .collect();
        if !evicted.is_empty() {
            info!(count = evicted.len(), remaining = self.store.len(), "Evicted expired sessions");
        }
        evicted
    }
}

impl<S: SessionStore> fmt::Debug for SessionReconciler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionReconciler")
            .field("config", &self.config)
            .field("sessions", &self.store.len())
            .finish()
    }
}
