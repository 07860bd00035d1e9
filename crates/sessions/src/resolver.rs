//! Contextual entity resolution for free-text utterances.
//!
//! A deliberately shallow keyword matcher. Precedence, highest first:
//!
//! 1. earliest-reference words ("initial", "first", "original")
//! 2. most-recent words ("last", "latest", "current")
//! 3. previous words ("previous", "before"): the reference just before the
//!    most recent one
//! 4. a known entity name appearing in the utterance (newest name first)
//! 5. the most recent reference, unless the utterance says "old"

use crate::entity::EntityIndex;

const EARLIEST_WORDS: [&str; 3] = ["initial", "first", "original"];
const LATEST_WORDS: [&str; 3] = ["last", "latest", "current"];
const PREVIOUS_WORDS: [&str; 2] = ["previous", "before"];
const OLDER_MARKER: &str = "old";

/// Resolve which `entity_type` reference `utterance` most likely means.
pub(crate) fn resolve_contextual_entity_id(
    index: &EntityIndex,
    entity_type: &str,
    utterance: &str,
) -> Option<String> {
    let refs = index.chronological(entity_type);
    let (earliest, latest) = match (refs.first(), refs.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return None,
    };

    let text = utterance.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if mentions(&EARLIEST_WORDS) {
        return Some(earliest.entity_id.clone());
    }
    if mentions(&LATEST_WORDS) {
        return Some(latest.entity_id.clone());
    }
    if mentions(&PREVIOUS_WORDS) {
        // With a single reference the latest is also the earliest and
        // there is nothing before it.
        return refs
            .len()
            .checked_sub(2)
            .map(|i| refs[i].entity_id.clone());
    }

    let by_name = refs.iter().rev().find(|r| {
        r.name
            .as_deref()
            .map(|name| !name.trim().is_empty() && text.contains(&name.to_lowercase()))
            .unwrap_or(false)
    });
    if let Some(reference) = by_name {
        return Some(reference.entity_id.clone());
    }

    if text.contains(OLDER_MARKER) {
        None
    } else {
        Some(latest.entity_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use oa_domain::message::{keys, Message};

    fn index_alpha_beta() -> EntityIndex {
        let t1 = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        let t2 = Utc.timestamp_opt(1_700_000_002, 0).unwrap();
        let mut index = EntityIndex::default();
        index.record(
            &Message::assistant("created")
                .with_entity("Objective", "R1")
                .with_metadata(keys::ENTITY_NAME, "Alpha")
                .at(t1),
            0,
        );
        index.record(
            &Message::assistant("created")
                .with_entity("Objective", "R2")
                .with_metadata(keys::ENTITY_NAME, "Beta")
                .at(t2),
            1,
        );
        index
    }

    fn resolve(index: &EntityIndex, utterance: &str) -> Option<String> {
        resolve_contextual_entity_id(index, "Objective", utterance)
    }

    #[test]
    fn first_resolves_to_earliest() {
        assert_eq!(resolve(&index_alpha_beta(), "Update the first one").as_deref(), Some("R1"));
        assert_eq!(resolve(&index_alpha_beta(), "the ORIGINAL objective").as_deref(), Some("R1"));
    }

    #[test]
    fn latest_resolves_to_most_recent() {
        assert_eq!(resolve(&index_alpha_beta(), "the latest").as_deref(), Some("R2"));
    }

    #[test]
    fn previous_resolves_to_one_before_latest() {
        assert_eq!(resolve(&index_alpha_beta(), "the previous one").as_deref(), Some("R1"));
    }

    #[test]
    fn previous_with_single_reference_is_none() {
        let mut index = EntityIndex::default();
        index.record(&Message::assistant("x").with_entity("Objective", "only"), 0);
        assert!(resolve(&index, "the one before").is_none());
    }

    #[test]
    fn name_match_resolves_named_reference() {
        assert_eq!(resolve(&index_alpha_beta(), "tell me about Alpha").as_deref(), Some("R1"));
        assert_eq!(resolve(&index_alpha_beta(), "rename beta please").as_deref(), Some("R2"));
    }

    #[test]
    fn temporal_words_beat_names() {
        // "first" wins even though "Beta" is named.
        assert_eq!(resolve(&index_alpha_beta(), "is Beta the first?").as_deref(), Some("R1"));
    }

    #[test]
    fn no_keyword_defaults_to_latest() {
        assert_eq!(resolve(&index_alpha_beta(), "add a key result to it").as_deref(), Some("R2"));
    }

    #[test]
    fn old_without_keyword_is_none() {
        assert!(resolve(&index_alpha_beta(), "show me an old one").is_none());
    }

    #[test]
    fn unknown_type_is_none() {
        assert!(resolve_contextual_entity_id(&index_alpha_beta(), "Task", "the latest").is_none());
    }
}
