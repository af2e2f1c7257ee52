//! crates/movie_quiz_core/src/session_store.rs
//!
//! Capacity-bounded, time-expiring map of quiz sessions.
//!
//! Expiry is passive: an expired entry is dropped when it is next looked up, or
//! when it is chosen for eviction because the store is full. Once removed, an id
//! never comes back.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::QuizSession;

#[derive(Debug)]
pub struct SessionStore {
    capacity: usize,
    entries: Mutex<HashMap<Uuid, QuizSession>>,
}

impl SessionStore {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `session` under `id`, expiring `ttl` from now.
    ///
    /// When the store is full and `id` is new, the entry closest to expiry is
    /// evicted first. Replacing an existing id never evicts.
    pub async fn put(&self, id: Uuid, session: QuizSession, ttl: Duration) {
        self.put_at(id, session, ttl, Utc::now()).await
    }

    pub(crate) async fn put_at(
        &self,
        id: Uuid,
        mut session: QuizSession,
        ttl: Duration,
        now: DateTime<Utc>,
    ) {
        session.expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entries = self.entries.lock().await;
        if !entries.contains_key(&id) && entries.len() >= self.capacity {
            let victim = entries
                .iter()
                .min_by_key(|(_, s)| s.expires_at)
                .map(|(key, _)| *key);
            if let Some(victim) = victim {
                entries.remove(&victim);
                info!("Session store full ({}), evicted session {}", self.capacity, victim);
            }
        }
        entries.insert(id, session);
    }

    /// Returns the live session for `id`. An expired entry is removed and
    /// reported as absent.
    pub async fn get(&self, id: &Uuid) -> Option<QuizSession> {
        self.get_at(id, Utc::now()).await
    }

    pub(crate) async fn get_at(&self, id: &Uuid, now: DateTime<Utc>) -> Option<QuizSession> {
        let mut entries = self.entries.lock().await;
        Self::live_entry(&mut entries, id, now).cloned()
    }

    /// Removes `id`. Removing an absent id is a no-op.
    pub async fn delete(&self, id: &Uuid) {
        self.entries.lock().await.remove(id);
    }

    /// Reads and removes the live session for `id` under one lock, so a session
    /// can be consumed at most once even with concurrent callers.
    pub async fn take(&self, id: &Uuid) -> Option<QuizSession> {
        self.take_at(id, Utc::now()).await
    }

    pub(crate) async fn take_at(&self, id: &Uuid, now: DateTime<Utc>) -> Option<QuizSession> {
        let mut entries = self.entries.lock().await;
        Self::live_entry(&mut entries, id, now)?;
        entries.remove(id)
    }

    /// Snapshot of all live sessions, oldest first.
    pub async fn entries(&self) -> Vec<QuizSession> {
        self.entries_at(Utc::now()).await
    }

    pub(crate) async fn entries_at(&self, now: DateTime<Utc>) -> Vec<QuizSession> {
        let entries = self.entries.lock().await;
        let mut live: Vec<QuizSession> = entries
            .values()
            .filter(|s| s.expires_at > now)
            .cloned()
            .collect();
        live.sort_by_key(|s| s.created_at);
        live
    }

    /// Number of stored entries, including expired ones not yet reclaimed.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn live_entry<'a>(
        entries: &'a mut HashMap<Uuid, QuizSession>,
        id: &Uuid,
        now: DateTime<Utc>,
    ) -> Option<&'a QuizSession> {
        let expired = entries.get(id)?.expires_at <= now;
        if expired {
            debug!("Session {} expired", id);
            entries.remove(id);
            return None;
        }
        entries.get(id)
    }
}
