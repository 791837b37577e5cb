//! Conversation store integration tests

use chatbridge_core::{ConversationStore, Role, Turn};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;

fn store(limit: usize) -> ConversationStore {
    ConversationStore::new(limit, Duration::from_secs(24 * 60 * 60))
}

mod conversation_store_tests {
    use super::*;

    #[test]
    fn test_history_never_exceeds_limit() {
        let store = store(20);
        for i in 0..57 {
            let role = if i % 2 == 0 { Role::User } else { Role::Model };
            store.append_turn("alice", role, format!("turn {}", i));
            assert!(store.get_history("alice").len() <= 20);
        }

        let history = store.get_history("alice");
        assert_eq!(history.len(), 20);
        // Oldest dropped first, order preserved
        assert_eq!(history[0].text, "turn 37");
        assert_eq!(history[19].text, "turn 56");
    }

    #[test]
    fn test_exchanges_keep_user_first_alternation() {
        let store = store(20);
        for i in 0..15 {
            store.append_exchange("bob", format!("q{}", i), format!("a{}", i));
        }

        let history = store.get_history("bob");
        assert_eq!(history.len(), 20);
        assert_eq!(history[0], Turn::user("q5"));
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Model);
        }
    }

    #[test]
    fn test_only_user_and_model_turns_are_returned() {
        let store = store(20);
        store.append_turn("carol", Role::User, "hi");
        store.append_turn("carol", Role::Tool, "{\"result\":1}");
        store.append_turn("carol", Role::System, "be nice");
        store.append_turn("carol", Role::Model, "hello");

        let history = store.get_history("carol");
        assert_eq!(history, vec![Turn::user("hi"), Turn::model("hello")]);
        assert!(history.iter().all(|t| t.role.is_conversational()));
    }

    #[test]
    fn test_clear_then_get_is_empty() {
        let store = store(20);
        store.append_exchange("dave", "hi", "hello");
        store.clear("dave");
        store.clear("dave");
        store.clear("nobody");

        assert!(store.get_history("dave").is_empty());
        assert!(!store.has_session("dave"));
    }

    #[test]
    fn test_stats_sum_all_sessions() {
        let store = store(20);
        store.append_exchange("a", "1", "2");
        store.append_exchange("b", "1", "2");
        store.append_turn("b", Role::User, "3");
        store.append_turn("c", Role::Tool, "ignored");

        let stats = store.stats();
        assert_eq!(stats.total_users, 3);
        assert_eq!(stats.total_messages, 5);
        assert_eq!(store.session_count(), 3);
    }

    #[test]
    fn test_sweep_removes_exactly_expired_sessions() {
        let store = store(20);
        let now = Utc::now();
        let expiry = ChronoDuration::hours(24);

        store.append_turn_at("stale", Role::User, "old", now - expiry - ChronoDuration::seconds(1));
        store.append_turn_at("boundary", Role::User, "edge", now - expiry);
        store.append_turn_at("fresh", Role::User, "new", now - ChronoDuration::hours(1));

        let removed = store.sweep_expired_at(now);

        assert_eq!(removed, 1);
        assert!(!store.has_session("stale"));
        assert!(store.has_session("boundary"));
        assert!(store.has_session("fresh"));
    }

    #[test]
    fn test_activity_refresh_postpones_expiry() {
        let store = store(20);
        let now = Utc::now();

        store.append_turn_at("erin", Role::User, "hi", now - ChronoDuration::hours(30));
        store.append_turn_at("erin", Role::Tool, "", now - ChronoDuration::hours(2));

        assert_eq!(store.sweep_expired_at(now), 0);
        assert_eq!(store.get_history("erin").len(), 1);
    }

    #[test]
    fn test_concurrent_appends_respect_limit() {
        let store = Arc::new(store(20));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append_exchange("shared", format!("q{}-{}", t, i), "a");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let history = store.get_history("shared");
        assert_eq!(history.len(), 20);
        for pair in history.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Model);
        }
    }
}
