//! Session accumulator storage.
//!
//! The reconciler never owns global state: it is handed a `SessionStore`.
//! Each closure-taking method runs with exclusive access to one session's
//! accumulator, which is what keeps a single session to one mutator at a time
//! while independent sessions proceed in parallel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::accumulator::SessionAccumulator;

/// Keyed storage for session accumulators.
///
/// Closures passed to these methods must not call back into the same store;
/// implementations may hold a lock on the session while they run.
pub trait SessionStore: Send + Sync {
    /// Run `f` on the accumulator for `session_id`, creating it (first seen at
    /// `first_seen`) if absent.
    fn with_session<R>(
        &self,
        session_id: &str,
        first_seen: DateTime<Utc>,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> R;

    /// Run `f` on the accumulator for `session_id` only if it exists.
    fn with_existing<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> Option<R>;

    /// Remove and return the accumulator for `session_id`.
    fn remove(&self, session_id: &str) -> Option<SessionAccumulator>;

    /// Remove the accumulator only if `predicate` holds, atomically.
    fn remove_if(
        &self,
        session_id: &str,
        predicate: impl FnOnce(&SessionAccumulator) -> bool,
    ) -> Option<SessionAccumulator>;

    /// Ids of all stored sessions, sorted.
    fn session_ids(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store backed by `DashMap`.
///
/// DashMap shards its locks, so sessions on different shards never contend
/// and an entry guard gives exclusive access to one accumulator.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: DashMap<String, SessionAccumulator>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloned copy of a session's accumulator.
    ///
    /// The clone is taken immediately so no `DashMap` guard outlives the call.
    pub fn snapshot(&self, session_id: &str) -> Option<SessionAccumulator> {
        self.inner.get(session_id).map(|r| r.value().clone())
    }
}

impl SessionStore for InMemorySessionStore {
    fn with_session<R>(
        &self,
        session_id: &str,
        first_seen: DateTime<Utc>,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> R {
        let mut entry = self
            .inner
            .entry(session_id.to_owned())
            .or_insert_with(|| SessionAccumulator::new(session_id, first_seen));
        f(entry.value_mut())
    }

    fn with_existing<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> Option<R> {
        self.inner
            .get_mut(session_id)
            .map(|mut entry| f(entry.value_mut()))
    }

    fn remove(&self, session_id: &str) -> Option<SessionAccumulator> {
        self.inner.remove(session_id).map(|(_, acc)| acc)
    }

    fn remove_if(
        &self,
        session_id: &str,
        predicate: impl FnOnce(&SessionAccumulator) -> bool,
    ) -> Option<SessionAccumulator> {
        self.inner
            .remove_if(session_id, |_, acc| predicate(acc))
            .map(|(_, acc)| acc)
    }

    fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T: SessionStore> SessionStore for &T {
    fn with_session<R>(
        &self,
        session_id: &str,
        first_seen: DateTime<Utc>,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> R {
        (**self).with_session(session_id, first_seen, f)
    }

    fn with_existing<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> Option<R> {
        (**self).with_existing(session_id, f)
    }

    fn remove(&self, session_id: &str) -> Option<SessionAccumulator> {
        (**self).remove(session_id)
    }

    fn remove_if(
        &self,
        session_id: &str,
        predicate: impl FnOnce(&SessionAccumulator) -> bool,
    ) -> Option<SessionAccumulator> {
        (**self).remove_if(session_id, predicate)
    }

    fn session_ids(&self) -> Vec<String> {
        (**self).session_ids()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

impl<T: SessionStore> SessionStore for Arc<T> {
    fn with_session<R>(
        &self,
        session_id: &str,
        first_seen: DateTime<Utc>,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> R {
        (**self).with_session(session_id, first_seen, f)
    }

    fn with_existing<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionAccumulator) -> R,
    ) -> Option<R> {
        (**self).with_existing(session_id, f)
    }

    fn remove(&self, session_id: &str) -> Option<SessionAccumulator> {
        (**self).remove(session_id)
    }

    fn remove_if(
        &self,
        session_id: &str,
        predicate: impl FnOnce(&SessionAccumulator) -> bool,
    ) -> Option<SessionAccumulator> {
        (**self).remove_if(session_id, predicate)
    }

    fn session_ids(&self) -> Vec<String> {
        (**self).session_ids()
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}
