use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known metadata keys carried on messages.
pub mod keys {
    /// Id of the user who authored a message (used for participant lookup).
    pub const USER_ID: &str = "UserId";
    /// Display name of the entity a message created or touched.
    pub const ENTITY_NAME: &str = "EntityName";
    /// Author display fields. These are never echoed into transcripts.
    pub const AUTHOR: &str = "Author";
    pub const USER_NAME: &str = "UserName";
}

/// Canonical form of a conversation id. Every store and workflow lookup
/// goes through this, so `" c1 "` and `"c1"` name the same conversation.
pub fn normalize_conversation_id(id: &str) -> &str {
    id.trim()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// The business entity a message created or affected.
///
/// Type and id always travel together: a message either references an
/// entity fully or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTag {
    pub entity_type: String,
    pub entity_id: String,
}

/// One conversation turn.
///
/// Messages are built with the constructors and `with_*` helpers below and
/// are never mutated once a conversation history owns them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Name of the function/tool this message carries the result of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    /// Serialized JSON output of that function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityTag>,
    /// Operation performed on the entity (e.g. `"create"`, `"update"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            timestamp: Utc::now(),
            function_name: None,
            function_output: None,
            entity: None,
            operation: None,
            metadata: BTreeMap::new(),
        }
    }
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
    pub fn tool(text: impl Into<String>) -> Self {
        Self::new(Role::Tool, text)
    }

    /// A message with no textual content (e.g. a pure function result).
    pub fn empty(role: Role) -> Self {
        Self {
            content: None,
            ..Self::new(role, "")
        }
    }

    pub fn with_function(mut self, name: impl Into<String>, output: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self.function_output = Some(output.into());
        self
    }

    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity = Some(EntityTag {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        });
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Override the timestamp (defaults to creation time).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Textual content, or `""` when the message has none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.entity.as_ref().map(|e| e.entity_type.as_str())
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity.as_ref().map(|e| e.entity_id.as_str())
    }

    /// `true` when the content contains a fenced code block.
    pub fn has_code_fence(&self) -> bool {
        self.text().contains("```")
    }
}

/// A role-tagged text entry as sent to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}
