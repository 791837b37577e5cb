//! In-memory conversation store

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{Role, Session, Turn};
use crate::config::{defaults, ConversationConfig};

/// Aggregate counts across all sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_users: usize,
    pub total_messages: usize,
}

/// Per-user conversation history, owned by one process.
///
/// The whole table sits behind one mutex; every operation holds it only for
/// in-memory work, never across an `.await`. That serializes appends,
/// clears and the expiry sweep per user.
pub struct ConversationStore {
    sessions: Mutex<HashMap<String, Session>>,
    history_limit: usize,
    history_expiry: chrono::Duration,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(defaults::HISTORY_LIMIT, defaults::HISTORY_EXPIRY)
    }
}

impl ConversationStore {
    pub fn new(history_limit: usize, history_expiry: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_limit,
            history_expiry: chrono::Duration::from_std(history_expiry)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(config.history_limit, config.history_expiry())
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// User and model turns of `user_id`, oldest first; empty for unknown users
    pub fn get_history(&self, user_id: &str) -> Vec<Turn> {
        let sessions = self.sessions.lock();
        sessions
            .get(user_id)
            .map(|session| {
                session
                    .messages
                    .iter()
                    .filter(|turn| turn.role.is_conversational())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn append_turn(&self, user_id: &str, role: Role, text: impl Into<String>) {
        self.append_turn_at(user_id, role, text, Utc::now());
    }

    /// [`append_turn`](Self::append_turn) with an explicit clock
    pub fn append_turn_at(&self, user_id: &str, role: Role, text: impl Into<String>, now: DateTime<Utc>) {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, now));
        session.push(Turn::new(role, text), self.history_limit, now);
        debug!(user_id, %role, messages = session.messages.len(), "Appended turn");
    }

    /// Record a completed exchange: the user text, then the model reply.
    ///
    /// Both turns land under one lock acquisition, so no reader ever sees
    /// the user turn without its reply.
    pub fn append_exchange(&self, user_id: &str, user_text: impl Into<String>, model_text: impl Into<String>) {
        let now = Utc::now();
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, now));
        session.push(Turn::user(user_text), self.history_limit, now);
        session.push(Turn::model(model_text), self.history_limit, now);
        debug!(user_id, messages = session.messages.len(), "Appended exchange");
    }

    /// Forget a user's session; no-op when absent
    pub fn clear(&self, user_id: &str) {
        if self.sessions.lock().remove(user_id).is_some() {
            debug!(user_id, "Cleared session");
        }
    }

    pub fn stats(&self) -> StoreStats {
        let sessions = self.sessions.lock();
        StoreStats {
            total_users: sessions.len(),
            total_messages: sessions.values().map(|s| s.messages.len()).sum(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn has_session(&self, user_id: &str) -> bool {
        self.sessions.lock().contains_key(user_id)
    }

    pub fn last_activity(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.sessions.lock().get(user_id).map(|s| s.last_activity)
    }

    /// Remove sessions idle for longer than the expiry; returns how many
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    /// [`sweep_expired`](Self::sweep_expired) with an explicit clock
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.history_expiry) else {
            return 0;
        };
        let mut sessions = self.sessions.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_activity >= cutoff);
        let removed = before - sessions.len();

        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Swept expired sessions");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_has_empty_history() {
        let store = ConversationStore::default();
        assert!(store.get_history("nobody").is_empty());
        assert!(!store.has_session("nobody"));
    }

    #[test]
    fn test_append_creates_session_lazily() {
        let store = ConversationStore::default();
        store.append_turn("u1", Role::User, "hello");

        assert!(store.has_session("u1"));
        assert_eq!(store.get_history("u1"), vec![Turn::user("hello")]);
    }

    #[test]
    fn test_non_conversational_turn_creates_empty_session() {
        let store = ConversationStore::default();
        store.append_turn("u1", Role::Tool, "{\"result\":1}");

        assert!(store.has_session("u1"));
        assert!(store.get_history("u1").is_empty());
        assert_eq!(store.stats(), StoreStats { total_users: 1, total_messages: 0 });
    }

    #[test]
    fn test_append_exchange_order() {
        let store = ConversationStore::default();
        store.append_exchange("u1", "hi", "hello there");

        assert_eq!(
            store.get_history("u1"),
            vec![Turn::user("hi"), Turn::model("hello there")]
        );
    }

    #[test]
    fn test_expiry_saturates() {
        let store = ConversationStore::new(4, Duration::MAX);
        store.append_turn("u1", Role::User, "x");
        assert_eq!(store.sweep_expired(), 0);
    }
}
