//! Conversational context kept between requests.
//!
//! A `SessionStore` is owned by the caller and handed to the orchestrator by
//! `&mut`; nothing here is global. Capacity, idle TTL and history length are
//! explicit in `SessionPolicy`.

use std::num::NonZeroUsize;

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MAX_TOPICS: usize = 20;
const SUMMARY_TURNS: usize = 3;
const SUMMARY_TOPICS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub max_sessions: usize,
    /// Idle time after which a session is dropped.
    pub ttl: Duration,
    pub max_history: usize,
}

impl Default for SessionPolicy {
    fn default() -> Self { Self { max_sessions: 1024, ttl: Duration::minutes(30), max_history: 10 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTurn {
    pub query: String,
    pub intent: Option<String>,
    pub chunk_ids: Vec<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    history: Vec<SessionTurn>,
    topics: Vec<String>,
    max_history: usize,
}

impl SessionContext {
    pub fn new(id: impl Into<String>, max_history: usize) -> Self { Self::started_at(id, max_history, Utc::now()) }

    fn started_at(id: impl Into<String>, max_history: usize, now: DateTime<Utc>) -> Self {
        Self { id: id.into(), created_at: now, last_seen: now, history: Vec::new(), topics: Vec::new(), max_history }
    }

    /// Appends a turn, dropping the oldest beyond the history cap. The
    /// turn's intent is remembered as a topic.
    pub fn record(&mut self, turn: SessionTurn) {
        if let Some(intent) = turn.intent.as_deref().filter(|i| !i.is_empty()) {
            if !self.topics.iter().any(|t| t == intent) {
                self.topics.push(intent.to_string());
            }
            if self.topics.len() > MAX_TOPICS {
                self.topics.drain(..self.topics.len() - MAX_TOPICS);
            }
        }
        self.last_seen = self.last_seen.max(turn.at);
        self.history.push(turn);
        if self.history.len() > self.max_history {
            self.history.drain(..self.history.len() - self.max_history);
        }
    }

    pub fn history(&self) -> &[SessionTurn] { &self.history }

    pub fn topics(&self) -> &[String] { &self.topics }

    /// Short text rendering of recent topics and queries, empty for a fresh
    /// session.
    pub fn summary(&self) -> String {
        if self.history.is_empty() {
            return String::new();
        }
        let mut parts = Vec::new();
        if !self.topics.is_empty() {
            let start = self.topics.len().saturating_sub(SUMMARY_TOPICS);
            parts.push(format!("Topics: {}", self.topics[start..].join(", ")));
        }
        let start = self.history.len().saturating_sub(SUMMARY_TURNS);
        for turn in &self.history[start..] {
            parts.push(format!("Previous query: {}", turn.query));
        }
        parts.join("\n")
    }
}

/// Bounded set of sessions with idle expiry and least-recently-used eviction.
#[derive(Debug)]
pub struct SessionStore {
    policy: SessionPolicy,
    sessions: LruCache<String, SessionContext>,
}

impl Default for SessionStore {
    fn default() -> Self { Self::new(SessionPolicy::default()) }
}

impl SessionStore {
    /// A `max_sessions` of zero is treated as one.
    pub fn new(policy: SessionPolicy) -> Self {
        let cap = NonZeroUsize::new(policy.max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self { policy, sessions: LruCache::new(cap) }
    }

    pub fn policy(&self) -> &SessionPolicy { &self.policy }

    pub fn session(&mut self, id: &str) -> &mut SessionContext { self.session_at(id, Utc::now()) }

    /// Returns the live session `id`, creating it if needed, and marks it
    /// most recently used. Expired sessions are purged first; when the store
    /// is full the least recently used session is evicted to make room.
    pub fn session_at(&mut self, id: &str, now: DateTime<Utc>) -> &mut SessionContext {
        self.evict_expired(now);
        let max_history = self.policy.max_history;
        if !self.sessions.contains(id) {
            if let Some((evicted, _)) = self.sessions.push(id.to_string(), SessionContext::started_at(id, max_history, now)) {
                debug!(session = %evicted, "evicting least recently used session");
            }
        }
        let session = self.sessions.get_or_insert_mut(id.to_string(), || SessionContext::started_at(id, max_history, now));
        session.last_seen = session.last_seen.max(now);
        session
    }

    /// Drops sessions idle longer than the TTL; returns how many went.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.policy.ttl;
        let expired: Vec<String> = self.sessions.iter().filter(|(_, s)| now - s.last_seen > ttl).map(|(id, _)| id.clone()).collect();
        for id in &expired {
            self.sessions.pop(id);
        }
        if !expired.is_empty() {
            debug!(evicted = expired.len(), "expired sessions dropped");
        }
        expired.len()
    }

    /// Looks a session up without touching its recency.
    pub fn get(&self, id: &str) -> Option<&SessionContext> { self.sessions.peek(id) }

    pub fn len(&self) -> usize { self.sessions.len() }

    pub fn is_empty(&self) -> bool { self.sessions.is_empty() }
}
