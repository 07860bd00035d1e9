//! Process-wide conversation store.
//!
//! Maps conversation ids to shared [`ConversationHistory`] handles. Entries
//! are created lazily on first access and live until removed, pruned for
//! idleness, or the process exits.
//!
//! Lock order: the store map lock may be held while *trying* a history
//! lock (pruning), never the other way round.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::RwLock;

use oa_domain::message::normalize_conversation_id;
use oa_domain::trace::TraceEvent;

use crate::history::ConversationHistory;

/// Shared handle to one conversation's history.
pub type SharedHistory = Arc<RwLock<ConversationHistory>>;

#[derive(Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, SharedHistory>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the history for `conversation_id`, creating it on first use.
    ///
    /// Concurrent first accesses for the same id all observe one instance.
    /// A blank id yields a fresh scratch history that is not registered, so
    /// id-less callers never share state.
    pub fn get_or_create(&self, conversation_id: &str) -> SharedHistory {
        let id = normalize_conversation_id(conversation_id);
        if id.is_empty() {
            return Arc::new(RwLock::new(ConversationHistory::scratch()));
        }

        // Fast path: conversation already exists.
        if let Some(existing) = self.conversations.read().get(id) {
            return existing.clone();
        }

        // Slow path: insert under the write lock. Another caller may have
        // won the race between the two locks; `entry` keeps theirs.
        let mut created = false;
        let handle = self
            .conversations
            .write()
            .entry(id.to_owned())
            .or_insert_with(|| {
                created = true;
                Arc::new(RwLock::new(ConversationHistory::new(id)))
            })
            .clone();

        if created {
            TraceEvent::ConversationCreated {
                conversation_id: id.to_owned(),
            }
            .emit();
        }

        handle
    }

    /// Look up a conversation without creating it.
    pub fn get(&self, conversation_id: &str) -> Option<SharedHistory> {
        self.conversations
            .read()
            .get(normalize_conversation_id(conversation_id))
            .cloned()
    }

    pub fn contains(&self, conversation_id: &str) -> bool {
        self.conversations
            .read()
            .contains_key(normalize_conversation_id(conversation_id))
    }

    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }

    /// Clear a conversation in place. The same instance stays registered.
    ///
    /// Returns `false` (and logs) when the id is unknown.
    pub fn reset(&self, conversation_id: &str) -> bool {
        let conversation_id = normalize_conversation_id(conversation_id);
        let Some(handle) = self.get(conversation_id) else {
            tracing::warn!(
                conversation_id = conversation_id,
                "reset requested for unknown conversation"
            );
            return false;
        };

        let messages_cleared = handle.write().clear();
        TraceEvent::ConversationReset {
            conversation_id: conversation_id.to_owned(),
            messages_cleared,
        }
        .emit();
        true
    }

    /// Drop a conversation entirely. Returns `false` when the id is unknown.
    pub fn remove(&self, conversation_id: &str) -> bool {
        let conversation_id = normalize_conversation_id(conversation_id);
        let removed = self.conversations.write().remove(conversation_id).is_some();
        if removed {
            TraceEvent::ConversationRemoved {
                conversation_id: conversation_id.to_owned(),
            }
            .emit();
        } else {
            tracing::debug!(
                conversation_id = conversation_id,
                "remove requested for unknown conversation"
            );
        }
        removed
    }

    /// Conversations in which `user_id` authored at least one user message.
    ///
    /// An empty `user_id` matches nothing. Results are sorted by id.
    pub fn list_by_participant(&self, user_id: &str) -> Vec<(String, SharedHistory)> {
        if user_id.trim().is_empty() {
            return Vec::new();
        }
        self.list_all()
            .into_iter()
            .filter(|(_, handle)| handle.read().has_participant(user_id))
            .collect()
    }

    /// Every registered conversation, sorted by id. Diagnostic use.
    pub fn list_all(&self) -> Vec<(String, SharedHistory)> {
        let mut all: Vec<(String, SharedHistory)> = self
            .conversations
            .read()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Remove conversations with no activity for longer than `max_idle`.
    ///
    /// A conversation is kept while its history lock is held or while
    /// `in_use(id)` reports it busy (a turn waiting on the completion
    /// service holds no history lock). Returns the removed ids, sorted.
    ///
    /// `in_use` runs under the store's write lock and must not call back
    /// into the store.
    pub fn prune_idle(&self, max_idle: Duration, in_use: impl Fn(&str) -> bool) -> Vec<String> {
        let cutoff = Utc::now() - max_idle;
        let mut conversations = self.conversations.write();
        let mut removed = Vec::new();

        conversations.retain(|id, handle| {
            let keep = in_use(id.as_str())
                || match handle.try_read() {
                    Some(history) => history.updated_at() > cutoff,
                    None => true,
                };
            if !keep {
                removed.push(id.clone());
            }
            keep
        });

        if !removed.is_empty() {
            TraceEvent::ConversationsPruned {
                removed: removed.len(),
                remaining: conversations.len(),
            }
            .emit();
        }
        removed.sort();
        removed
    }
}
