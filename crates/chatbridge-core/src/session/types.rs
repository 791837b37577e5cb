//! Session data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    /// Tool invocation traffic; never kept in history
    Tool,
    System,
}

impl Role {
    /// Whether turns with this role belong in persisted history
    pub fn is_conversational(self) -> bool {
        matches!(self, Self::User | Self::Model)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
            Self::Tool => "tool",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }
}

/// Conversation state of a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    /// Oldest first
    pub messages: Vec<Turn>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            messages: Vec::new(),
            last_activity: now,
        }
    }

    /// Append a conversational turn, then drop the oldest beyond `limit`.
    ///
    /// Non-conversational roles only refresh `last_activity`.
    pub fn push(&mut self, turn: Turn, limit: usize, now: DateTime<Utc>) {
        self.last_activity = now;
        if !turn.role.is_conversational() {
            return;
        }

        self.messages.push(turn);
        if self.messages.len() > limit {
            let excess = self.messages.len() - limit;
            self.messages.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Model).unwrap(), "\"model\"");
        assert_eq!(Role::User.to_string(), "user");
        assert!(Role::User.is_conversational());
        assert!(!Role::Tool.is_conversational());
    }

    #[test]
    fn test_push_truncates_from_front() {
        let now = Utc::now();
        let mut session = Session::new("u1", now);

        for i in 0..5 {
            session.push(Turn::user(format!("m{}", i)), 3, now);
        }

        let texts: Vec<_> = session.messages.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_push_tool_turn_only_touches_activity() {
        let start = Utc::now();
        let later = start + chrono::Duration::minutes(5);
        let mut session = Session::new("u1", start);

        session.push(Turn::new(Role::Tool, "{}"), 20, later);

        assert!(session.messages.is_empty());
        assert_eq!(session.last_activity, later);
    }
}
