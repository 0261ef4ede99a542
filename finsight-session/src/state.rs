//! Conversation history and the committed per-conversation snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::UserLevel;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Chunk ids the answer was grounded on. Assistant turns only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited_chunks: Vec<String>,
    /// Suggested next questions. Assistant turns only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_up_questions: Vec<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp,
            cited_chunks: Vec::new(),
            follow_up_questions: Vec::new(),
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        cited_chunks: Vec<String>,
        follow_up_questions: Vec<String>,
    ) -> Self {
        Self { role: Role::Assistant, text: text.into(), timestamp, cited_chunks, follow_up_questions }
    }
}

/// Everything the system remembers about one conversation.
///
/// The turn list only grows: there is no API to edit or remove a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    conversation_id: String,
    turns: Vec<Turn>,
    /// Document the conversation is scoped to, if any.
    pub document_id: Option<String>,
    /// Context block used by the most recent turn.
    pub last_context: Option<String>,
    pub user_level: UserLevel,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// A fresh state with no turns.
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            turns: Vec::new(),
            document_id: None,
            last_context: None,
            user_level: UserLevel::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The last `n` turns in chronological order.
    pub fn recent_turns(&self, n: usize) -> &[Turn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    pub fn push_turn(&mut self, turn: Turn) {
        self.updated_at = turn.timestamp.max(self.updated_at);
        self.turns.push(turn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_turns_keeps_newest_in_order() {
        let mut state = ConversationState::new("c1");
        for i in 0..5 {
            state.push_turn(Turn::user(format!("q{i}"), Utc::now()));
        }
        let texts: Vec<_> = state.recent_turns(2).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q3", "q4"]);
        assert_eq!(state.recent_turns(10).len(), 5);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut state = ConversationState::new("c1");
        state.document_id = Some("report-2024".into());
        state.user_level = UserLevel::Advanced;
        state.push_turn(Turn::user("What is EBITDA?", Utc::now()));
        state.push_turn(Turn::assistant("Earnings before...", Utc::now(), vec!["k1".into()], vec![]));

        let json = serde_json::to_string(&state).unwrap();
        let restored: ConversationState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.conversation_id(), "c1");
    }
}
