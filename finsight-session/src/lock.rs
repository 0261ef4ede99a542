//! Per-conversation turn serialization.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one async mutex per conversation id.
///
/// Turns on different conversations never contend; turns on the same
/// conversation queue in arrival order (tokio mutexes are fair).
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Held for the duration of one turn. Dropping it releases the conversation.
pub type ConversationGuard = OwnedMutexGuard<()>;

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn holds `conversation_id`, then take it.
    pub async fn acquire(&self, conversation_id: &str) -> ConversationGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries only referenced by the map have no holder or waiter.
            locks.retain(|id, lock| id == conversation_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(conversation_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of conversations currently tracked.
    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
