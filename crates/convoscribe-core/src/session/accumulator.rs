//! Per-session working state and its merge state machine.

use chrono::{DateTime, Utc};
use convoscribe_types::config::EvictionPolicy;
use convoscribe_types::conversation::{ContextSnapshot, SessionPhase, Turn};
use convoscribe_types::log::TtsEvent;
use std::collections::VecDeque;
use std::fmt;

use crate::conversation::assemble_snapshot;

/// Mutable state for one session, owned by the reconciler through a store.
#[derive(Debug, Clone)]
pub struct SessionAccumulator {
    session_id: String,
    phase: SessionPhase,
    latest_context: Option<ContextSnapshot>,
    /// Turns derived from `latest_context`; the merge target.
    turns: Vec<Turn>,
    pending_tts: VecDeque<TtsEvent>,
    /// TTS events dropped because a newer snapshot superseded them.
    discarded_tts: usize,
    first_seen: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Result of one merge attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No context snapshot has been observed yet.
    NoContext,
    /// The snapshot produced no turns.
    NoTurns,
    /// No TTS event follows the snapshot.
    NothingPending,
    /// The last turn already carries a reply; merge is a no-op.
    AlreadyAnswered,
    Merged { turn_id: u32, events: usize },
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeOutcome::NoContext => write!(f, "no_context"),
            MergeOutcome::NoTurns => write!(f, "no_turns"),
            MergeOutcome::NothingPending => write!(f, "nothing_pending"),
            MergeOutcome::AlreadyAnswered => write!(f, "already_answered"),
            MergeOutcome::Merged { turn_id, events } => {
                write!(f, "merged {events} event(s) into turn {turn_id}")
            }
        }
    }
}

impl SessionAccumulator {
    /// Create an empty accumulator first observed at `first_seen`.
    pub fn new(session_id: impl Into<String>, first_seen: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            phase: SessionPhase::Empty,
            latest_context: None,
            turns: Vec::new(),
            pending_tts: VecDeque::new(),
            discarded_tts: 0,
            first_seen,
            last_activity: first_seen,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn latest_context(&self) -> Option<&ContextSnapshot> {
        self.latest_context.as_ref()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn pending_tts(&self) -> &VecDeque<TtsEvent> {
        &self.pending_tts
    }

    pub fn discarded_tts(&self) -> usize {
        self.discarded_tts
    }

    pub fn first_seen(&self) -> DateTime<Utc> {
        self.first_seen
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Replace the latest context and rebuild the turn list from it.
    ///
    /// Pending TTS events at or before the new capture time can never merge
    /// again and are dropped. Returns how many were dropped.
    pub fn apply_context(&mut self, snapshot: ContextSnapshot) -> usize {
        let captured_at = snapshot.captured_at;
        let before = self.pending_tts.len();
        self.pending_tts.retain(|event| event.timestamp > captured_at);
        let discarded = before - self.pending_tts.len();
        self.discarded_tts += discarded;

        self.turns = assemble_snapshot(&snapshot);
        self.latest_context = Some(snapshot);
        self.phase = SessionPhase::AwaitingMerge;
        self.touch(captured_at);
        discarded
    }

    /// Buffer a TTS event. With a non-zero `max_pending`, the oldest event is
    /// evicted on overflow; returns `true` when that happened.
    pub fn push_tts(&mut self, event: TtsEvent, max_pending: usize) -> bool {
        self.touch(event.timestamp);
        self.pending_tts.push_back(event);
        if max_pending > 0 && self.pending_tts.len() > max_pending {
            self.pending_tts.pop_front();
            return true;
        }
        false
    }

    /// Attach buffered speech to the last turn if it has no reply yet.
    ///
    /// Only events strictly after the snapshot's capture time count; they are
    /// joined with single spaces in timestamp order. A reply, once set, is
    /// never overwritten, so repeated merges are no-ops.
    pub fn merge(&mut self) -> MergeOutcome {
        let Some(context) = &self.latest_context else {
            return MergeOutcome::NoContext;
        };
        let captured_at = context.captured_at;
        self.phase = SessionPhase::Merged;

        let Some(last) = self.turns.last_mut() else {
            return MergeOutcome::NoTurns;
        };
        if last.assistant_message.is_some() {
            return MergeOutcome::AlreadyAnswered;
        }

        let mut replies: Vec<&TtsEvent> = self
            .pending_tts
            .iter()
            .filter(|event| event.timestamp > captured_at)
            .collect();
        if replies.is_empty() {
            return MergeOutcome::NothingPending;
        }
        replies.sort_by_key(|event| event.timestamp);

        let text = replies
            .iter()
            .map(|event| event.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        last.assistant_message = Some(text);
        MergeOutcome::Merged {
            turn_id: last.turn_id,
            events: replies.len(),
        }
    }

    /// Whether the session has outlived `policy` as of `now`.
    pub fn is_expired(&self, policy: &EvictionPolicy, now: DateTime<Utc>) -> bool {
        let exceeds = |since: DateTime<Utc>, limit: u64| {
            limit > 0
                && now.signed_duration_since(since).num_seconds()
                    > i64::try_from(limit).unwrap_or(i64::MAX)
        };
        exceeds(self.last_activity, policy.max_idle_secs) || exceeds(self.first_seen, policy.max_age_secs)
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.last_activity {
            self.last_activity = at;
        }
    }
}
