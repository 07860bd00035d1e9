//! Per-conversation entity reference index.
//!
//! Every message tagged with an entity produces one [`EntityReference`],
//! filed under its entity type in append order. References are derived
//! data: they are only ever created by [`EntityIndex::record`], which the
//! conversation history calls as a side effect of appending a message.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use oa_domain::message::{keys, Message};

/// Keys probed, in order, when looking for an entity's display name in a
/// function's JSON output.
const NAME_KEYS: [&str; 4] = ["Name", "TeamName", "Title", "ObjectiveName"];

/// A link from a conversation message to the business entity it affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityReference {
    pub entity_id: String,
    pub entity_type: String,
    pub timestamp: DateTime<Utc>,
    pub operation: Option<String>,
    /// Position of the originating message in the history.
    pub message_index: usize,
    pub name: Option<String>,
}

/// `entity_type → references` in append order.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    by_type: BTreeMap<String, Vec<EntityReference>>,
}

impl EntityIndex {
    /// Record a reference for `message` if it carries an entity tag.
    pub(crate) fn record(&mut self, message: &Message, message_index: usize) {
        let Some(tag) = &message.entity else {
            return;
        };

        let reference = EntityReference {
            entity_id: tag.entity_id.clone(),
            entity_type: tag.entity_type.clone(),
            timestamp: message.timestamp,
            operation: message.operation.clone(),
            message_index,
            name: extract_entity_name(message),
        };

        self.by_type
            .entry(tag.entity_type.clone())
            .or_default()
            .push(reference);
    }

    pub(crate) fn clear(&mut self) {
        self.by_type.clear();
    }

    /// References for one entity type, in append order.
    pub fn references(&self, entity_type: &str) -> &[EntityReference] {
        self.by_type
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Known entity types, in sorted order.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.by_type.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// References for one entity type ordered oldest → newest.
    ///
    /// Ordered by timestamp; references sharing a timestamp keep append
    /// order, so the last appended one counts as the most recent.
    pub fn chronological(&self, entity_type: &str) -> Vec<&EntityReference> {
        let mut refs: Vec<&EntityReference> = self.references(entity_type).iter().collect();
        refs.sort_by_key(|r| (r.timestamp, r.message_index));
        refs
    }

    pub fn most_recent(&self, entity_type: &str) -> Option<&EntityReference> {
        self.references(entity_type)
            .iter()
            .max_by_key(|r| (r.timestamp, r.message_index))
    }

    pub fn earliest(&self, entity_type: &str) -> Option<&EntityReference> {
        self.references(entity_type)
            .iter()
            .min_by_key(|r| (r.timestamp, r.message_index))
    }
}

/// Best-effort display name for the entity a message references.
///
/// Tries the function output first (as a JSON object, probing
/// [`NAME_KEYS`] in order), then `metadata["EntityName"]`. Unparseable
/// output is not an error; it simply yields no name from that source.
pub fn extract_entity_name(message: &Message) -> Option<String> {
    message
        .function_output
        .as_deref()
        .and_then(name_from_output)
        .or_else(|| {
            message
                .metadata
                .get(keys::ENTITY_NAME)
                .filter(|n| !n.trim().is_empty())
                .cloned()
        })
}

fn name_from_output(output: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(output).ok()?;
    let obj = parsed.as_object()?;

    NAME_KEYS.iter().find_map(|key| match obj.get(*key)? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}
