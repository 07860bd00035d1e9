//! Per-conversation concurrency control.
//!
//! Conversation histories are not meant to be mutated by two turns at once.
//! Every turn holds its conversation's run lock from the moment the user
//! message is appended until the reply is stored; a second turn for the
//! same conversation waits.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Manages per-conversation run locks.
///
/// Each conversation id maps to a `Semaphore(1)`. The permit releases on
/// drop.
#[derive(Default)]
pub struct ConversationLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a conversation.
    pub async fn acquire(
        &self,
        conversation_id: &str,
    ) -> Result<OwnedSemaphorePermit, ConversationBusy> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(conversation_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        if let Ok(permit) = sem.clone().try_acquire_owned() {
            return Ok(permit);
        }

        tracing::debug!(conversation_id, "turn in progress, waiting for run lock");
        sem.acquire_owned().await.map_err(|_| ConversationBusy)
    }

    /// Number of tracked conversations.
    pub fn conversation_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether a turn currently holds or waits on the conversation's lock.
    pub fn is_active(&self, conversation_id: &str) -> bool {
        self.locks
            .lock()
            .get(conversation_id)
            .is_some_and(lock_in_use)
    }

    /// Forget locks nobody holds or waits on.
    pub fn prune_idle(&self) {
        self.locks.lock().retain(|_, sem| lock_in_use(sem));
    }
}

// The map holds one reference; anything above that is a caller.
fn lock_in_use(sem: &Arc<Semaphore>) -> bool {
    sem.available_permits() == 0 || Arc::strong_count(sem) > 1
}

/// The conversation's lock was closed while waiting.
#[derive(Debug)]
pub struct ConversationBusy;

impl std::fmt::Display for ConversationBusy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conversation is busy: a turn is already in progress")
    }
}

impl std::error::Error for ConversationBusy {}
