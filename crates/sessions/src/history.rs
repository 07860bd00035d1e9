//! Conversation history: the append-only message list of one conversation
//! and the entity reference index derived from it.
//!
//! A history is not internally synchronized. The store hands out
//! `Arc<RwLock<ConversationHistory>>` handles and callers are expected to
//! run at most one turn per conversation at a time.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use oa_domain::message::{keys, Message, Role};
use oa_domain::trace::TraceEvent;

use crate::entity::EntityIndex;

#[derive(Debug, Clone)]
pub struct ConversationHistory {
    id: String,
    messages: Vec<Message>,
    entities: EntityIndex,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConversationHistory {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            entities: EntityIndex::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A throwaway history that no store knows about.
    pub fn scratch() -> Self {
        Self::new(format!("scratch-{}", uuid::Uuid::new_v4()))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn entities(&self) -> &EntityIndex {
        &self.entities
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last time a message was appended or the history was cleared.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a message and index its entity reference, if any.
    ///
    /// Assistant messages containing a fenced code block are dropped: raw
    /// code in the transcript confuses entity tracking on later turns.
    /// Returns `false` when the message was dropped.
    pub fn add_message(&mut self, message: Message) -> bool {
        if message.role == Role::Assistant && message.has_code_fence() {
            tracing::debug!(
                conversation_id = %self.id,
                "dropping assistant message containing a code block"
            );
            TraceEvent::MessageDropped {
                conversation_id: self.id.clone(),
                reason: "code_block".into(),
            }
            .emit();
            return false;
        }

        let index = self.messages.len();
        self.entities.record(&message, index);
        self.messages.push(message);
        self.updated_at = Utc::now();
        true
    }

    /// Id of the newest reference of `entity_type`, if any.
    pub fn most_recent_entity_id(&self, entity_type: &str) -> Option<&str> {
        self.entities
            .most_recent(entity_type)
            .map(|r| r.entity_id.as_str())
    }

    /// Empty messages and references. Returns the number of messages
    /// removed.
    pub fn clear(&mut self) -> usize {
        let cleared = self.messages.len();
        self.messages.clear();
        self.entities.clear();
        self.updated_at = Utc::now();
        cleared
    }

    /// Every message that references exactly this entity, oldest first.
    pub fn entity_history(&self, entity_type: &str, entity_id: &str) -> Vec<&Message> {
        let mut matching: Vec<&Message> = self
            .messages
            .iter()
            .filter(|m| m.entity_type() == Some(entity_type) && m.entity_id() == Some(entity_id))
            .collect();
        matching.sort_by_key(|m| m.timestamp);
        matching
    }

    /// Output of the most recent `function_name` call, deserialized.
    ///
    /// `None` when there is no such call or its output doesn't
    /// deserialize into `T`.
    pub fn last_function_result<T: DeserializeOwned>(&self, function_name: &str) -> Option<T> {
        let (_, output) = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.function_name.as_deref() == Some(function_name))
            .filter_map(|(i, m)| {
                m.function_output
                    .as_deref()
                    .filter(|o| !o.trim().is_empty())
                    .map(|o| ((m.timestamp, i), o))
            })
            .max_by_key(|(key, _)| *key)?;

        match serde_json::from_str(output) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(
                    conversation_id = %self.id,
                    function = function_name,
                    error = %e,
                    "function result did not deserialize"
                );
                None
            }
        }
    }

    /// `true` if any user message was authored by `user_id`
    /// (case-insensitive).
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.messages.iter().any(|m| {
            m.role == Role::User
                && m.metadata
                    .get(keys::USER_ID)
                    .is_some_and(|uid| uid.eq_ignore_ascii_case(user_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn code_block_assistant_message_is_dropped() {
        let mut history = ConversationHistory::new("c1");
        history.add_message(Message::user("show me code"));
        let appended = history.add_message(Message::assistant("```json\n{}\n```"));
        assert!(!appended);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn code_block_from_user_is_kept() {
        let mut history = ConversationHistory::new("c1");
        assert!(history.add_message(Message::user("```sql\nselect 1\n```")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn reference_indices_are_strictly_increasing() {
        let mut history = ConversationHistory::new("c1");
        for i in 0..6 {
            history.add_message(Message::user(format!("turn {i}")));
            history.add_message(
                Message::assistant(format!("created {i}"))
                    .with_entity("Objective", format!("o-{i}")),
            );
            // Dropped messages must not leave gaps or reorder anything.
            history.add_message(Message::assistant("```\ncode\n```").with_entity("Objective", "x"));
        }

        let refs = history.entities().references("Objective");
        assert_eq!(refs.len(), 6);
        assert!(refs.windows(2).all(|w| w[0].message_index < w[1].message_index));
        for r in refs {
            assert_eq!(history.messages()[r.message_index].entity_id(), Some(r.entity_id.as_str()));
        }
    }

    #[test]
    fn most_recent_entity_id_uses_timestamp() {
        let mut history = ConversationHistory::new("c1");
        assert!(history.most_recent_entity_id("Objective").is_none());

        history.add_message(Message::assistant("b").with_entity("Objective", "newer").at(ts(20)));
        history.add_message(Message::assistant("a").with_entity("Objective", "older").at(ts(10)));
        assert_eq!(history.most_recent_entity_id("Objective"), Some("newer"));
    }

    #[test]
    fn clear_empties_messages_and_references() {
        let mut history = ConversationHistory::new("c1");
        history.add_message(Message::assistant("a").with_entity("Team", "t-1"));
        history.add_message(Message::user("thanks"));

        assert_eq!(history.clear(), 2);
        assert!(history.is_empty());
        assert!(history.entities().is_empty());
        assert_eq!(history.id(), "c1");
    }

    #[test]
    fn entity_history_filters_and_sorts() {
        let mut history = ConversationHistory::new("c1");
        history.add_message(Message::assistant("updated").with_entity("Objective", "o-1").at(ts(30)));
        history.add_message(Message::assistant("other").with_entity("Objective", "o-2").at(ts(10)));
        history.add_message(Message::assistant("created").with_entity("Objective", "o-1").at(ts(5)));
        history.add_message(Message::assistant("team").with_entity("Team", "o-1").at(ts(1)));

        let texts: Vec<&str> = history
            .entity_history("Objective", "o-1")
            .iter()
            .map(|m| m.text())
            .collect();
        assert_eq!(texts, ["created", "updated"]);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Team {
        #[serde(rename = "TeamName")]
        team_name: String,
    }

    #[test]
    fn last_function_result_returns_newest_output() {
        let mut history = ConversationHistory::new("c1");
        history.add_message(Message::tool("").with_function("get_team", r#"{"TeamName":"Old"}"#).at(ts(1)));
        history.add_message(Message::tool("").with_function("get_team", r#"{"TeamName":"New"}"#).at(ts(2)));
        history.add_message(Message::tool("").with_function("get_team", "  ").at(ts(3)));

        let team: Option<Team> = history.last_function_result("get_team");
        assert_eq!(team, Some(Team { team_name: "New".into() }));
    }

    #[test]
    fn last_function_result_bad_json_is_none() {
        let mut history = ConversationHistory::new("c1");
        history.add_message(Message::tool("").with_function("get_team", "{broken"));
        assert!(history.last_function_result::<Team>("get_team").is_none());
        assert!(history.last_function_result::<Team>("missing").is_none());
    }

    #[test]
    fn participant_match_is_case_insensitive_and_user_only() {
        let mut history = ConversationHistory::new("c1");
        history.add_message(Message::assistant("hi").with_metadata(keys::USER_ID, "bob"));
        assert!(!history.has_participant("bob"));

        history.add_message(Message::user("hello").with_metadata(keys::USER_ID, "Alice"));
        assert!(history.has_participant("alice"));
        assert!(history.has_participant("ALICE"));
    }
}
