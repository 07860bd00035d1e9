//! Linearization of a conversation history into the flat, role-tagged
//! transcript the completion service consumes.
//!
//! The transform is pure: the same history state always produces the same
//! transcript.

use std::collections::BTreeMap;

use oa_domain::message::{keys, ChatMessage, Message, Role};

use crate::history::ConversationHistory;
use crate::resolver::resolve_contextual_entity_id;

/// Metadata keys that identify the author and are never echoed.
const AUTHOR_KEYS: [&str; 2] = [keys::AUTHOR, keys::USER_NAME];

/// The linearized form of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearTranscript {
    pub entries: Vec<ChatMessage>,
    /// `function_name → output` of the latest call seen while linearizing.
    pub last_function_results: BTreeMap<String, String>,
}

impl LinearTranscript {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConversationHistory {
    /// Flatten the history into transcript entries, oldest first.
    ///
    /// - Assistant messages carrying a function result become a synthesized
    ///   `Context: ... / Result: ...` entry; their raw content is not sent.
    /// - User messages get one `Context: Referenced <type> ID: <id>` line per
    ///   entity type the utterance resolves against.
    /// - Metadata (minus author fields) is appended as `key: value` lines.
    /// - Entries that end up empty are skipped.
    pub fn to_linear_transcript(&self) -> LinearTranscript {
        let mut ordered: Vec<&Message> = self.messages().iter().collect();
        ordered.sort_by_key(|m| m.timestamp);

        let mut transcript = LinearTranscript::default();

        for message in ordered {
            if let Some(function) = &message.function_name {
                transcript.last_function_results.insert(
                    function.clone(),
                    message.function_output.clone().unwrap_or_default(),
                );

                if message.role == Role::Assistant {
                    transcript
                        .entries
                        .push(ChatMessage::assistant(function_context(message, function)));
                    continue;
                }
            }

            let mut lines: Vec<String> = Vec::new();
            if !message.text().trim().is_empty() {
                lines.push(message.text().to_owned());
            }

            if message.role == Role::User {
                for entity_type in self.entities().entity_types() {
                    if let Some(id) =
                        resolve_contextual_entity_id(self.entities(), entity_type, message.text())
                    {
                        lines.push(format!("Context: Referenced {entity_type} ID: {id}"));
                    }
                }
            }

            lines.extend(
                message
                    .metadata
                    .iter()
                    .filter(|(key, _)| !AUTHOR_KEYS.contains(&key.as_str()))
                    .map(|(key, value)| format!("{key}: {value}")),
            );

            if lines.is_empty() {
                continue;
            }
            transcript
                .entries
                .push(ChatMessage::new(message.role, lines.join("\n")));
        }

        transcript
    }
}

/// `Context: <operation> on <type> (ID <id>)` + `Result: <output>`.
///
/// Falls back to the function name when the message has no operation, and
/// to a bare `Context: <function>` header when it references no entity.
fn function_context(message: &Message, function: &str) -> String {
    let operation = message.operation.as_deref().unwrap_or(function);
    let header = match &message.entity {
        Some(tag) => format!(
            "Context: {operation} on {} (ID {})",
            tag.entity_type, tag.entity_id
        ),
        None => format!("Context: {operation}"),
    };
    let output = message.function_output.as_deref().unwrap_or("");
    format!("{header}\nResult: {output}").trim().to_owned()
}
