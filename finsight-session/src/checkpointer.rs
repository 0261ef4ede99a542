//! Durable storage of conversation snapshots.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::state::ConversationState;

/// Loads and commits whole [`ConversationState`] snapshots keyed by
/// conversation id.
///
/// `commit` replaces the stored snapshot atomically: a concurrent `load`
/// sees either the previous or the new snapshot, never a mix.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Return the last committed state, or a fresh empty state for an
    /// unknown id.
    async fn load(&self, conversation_id: &str) -> Result<ConversationState>;

    /// Replace the snapshot stored under `state.conversation_id()`.
    async fn commit(&self, state: &ConversationState) -> Result<()>;
}

/// Snapshots held in process memory. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    snapshots: RwLock<HashMap<String, ConversationState>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of conversations with at least one commit.
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn load(&self, conversation_id: &str) -> Result<ConversationState> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .get(conversation_id)
            .cloned()
            .unwrap_or_else(|| ConversationState::new(conversation_id)))
    }

    async fn commit(&self, state: &ConversationState) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        let replaced = snapshots.insert(state.conversation_id().to_string(), state.clone());
        debug!(
            conversation_id = state.conversation_id(),
            turns = state.turns().len(),
            replaced = replaced.is_some(),
            "committed in-memory checkpoint"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::state::Turn;

    #[tokio::test]
    async fn unknown_id_loads_fresh_state() {
        let store = InMemoryCheckpointer::new();
        let state = store.load("nope").await.unwrap();
        assert_eq!(state.conversation_id(), "nope");
        assert!(state.is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn commit_then_load_returns_snapshot() {
        let store = InMemoryCheckpointer::new();
        let mut state = store.load("c1").await.unwrap();
        state.push_turn(Turn::user("hello", Utc::now()));
        store.commit(&state).await.unwrap();

        assert_eq!(store.load("c1").await.unwrap(), state);
        assert!(store.load("c2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recommit_replaces_snapshot_without_adding_entries() {
        let store = InMemoryCheckpointer::new();
        let mut state = store.load("c1").await.unwrap();
        state.push_turn(Turn::user("first", Utc::now()));
        store.commit(&state).await.unwrap();
        state.push_turn(Turn::assistant("reply", Utc::now(), vec![], vec![]));
        store.commit(&state).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.load("c1").await.unwrap().turns().len(), 2);
    }
}
