use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use oa_domain::error::Result;
use oa_domain::message::normalize_conversation_id;
use oa_domain::trace::TraceEvent;

use crate::detector::{CreatedKind, PhraseDetector, ResponseDetector};
use crate::prompts;
use crate::stage::WorkflowStage;

/// Workflow state keys.
pub mod keys {
    pub const CURRENT_STEP: &str = "CurrentStep";
    pub const OKR_SESSION_ID: &str = "OkrSessionId";
    pub const OBJECTIVE_ID: &str = "ObjectiveId";
    pub const KEY_RESULT_ID: &str = "KeyResultId";
    pub const KEY_RESULT_TASK_ID: &str = "KeyResultTaskId";
}

/// One creation step: the kind announced, the stage it requires (if any),
/// the stage it leads to, where its id is stored, and what to append.
struct Step {
    kind: CreatedKind,
    requires: Option<WorkflowStage>,
    to: WorkflowStage,
    id_key: &'static str,
    continuation: &'static str,
}

/// Checked in order; the first matching step wins.
const STEPS: [Step; 4] = [
    Step {
        kind: CreatedKind::Session,
        requires: None,
        to: WorkflowStage::CreatedSession,
        id_key: keys::OKR_SESSION_ID,
        continuation: prompts::CREATE_OBJECTIVE,
    },
    Step {
        kind: CreatedKind::Objective,
        requires: Some(WorkflowStage::CreatedSession),
        to: WorkflowStage::CreatedObjective,
        id_key: keys::OBJECTIVE_ID,
        continuation: prompts::CREATE_KEY_RESULT,
    },
    Step {
        kind: CreatedKind::KeyResult,
        requires: Some(WorkflowStage::CreatedObjective),
        to: WorkflowStage::CreatedKeyResult,
        id_key: keys::KEY_RESULT_ID,
        continuation: prompts::CREATE_TASK,
    },
    Step {
        kind: CreatedKind::Task,
        requires: Some(WorkflowStage::CreatedKeyResult),
        to: WorkflowStage::CreatedKeyResultTask,
        id_key: keys::KEY_RESULT_TASK_ID,
        continuation: prompts::WRAP_UP,
    },
];

/// A stage change made by [`WorkflowEngine::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The kind of entity the response announced.
    pub kind: CreatedKind,
    pub from: WorkflowStage,
    pub to: WorkflowStage,
    pub entity_id: Option<String>,
    pub continuation_appended: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceOutcome {
    /// The response, possibly with a continuation prompt appended.
    pub text: String,
    /// `None` when the response matched no step.
    pub transition: Option<Transition>,
}

/// Per-conversation workflow state, keyed by conversation id.
///
/// State is created on the first transition and removed by [`reset`].
///
/// [`reset`]: WorkflowEngine::reset
pub struct WorkflowEngine {
    detector: Arc<dyn ResponseDetector>,
    states: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl WorkflowEngine {
    pub fn new(detector: Arc<dyn ResponseDetector>) -> Self {
        Self {
            detector,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Engine using the fixed phrase sets of [`PhraseDetector`].
    pub fn with_phrase_detector() -> Result<Self> {
        Ok(Self::new(Arc::new(PhraseDetector::new()?)))
    }

    /// Inspect `response` for the conversation, record any creation it
    /// announces and append the next-step prompt when the response does not
    /// already lead there.
    ///
    /// A blank conversation id is evaluated from `None` and nothing is
    /// stored.
    pub fn advance(&self, conversation_id: &str, response: &str) -> AdvanceOutcome {
        let conversation_id = normalize_conversation_id(conversation_id);
        let persist = !conversation_id.is_empty();

        // Hold the write lock across read-decide-write so concurrent advances
        // on one conversation apply one after the other.
        let mut states = self.states.write();
        let current = if persist {
            stage_of(states.get(conversation_id))
        } else {
            WorkflowStage::None
        };

        let Some(step) = STEPS.iter().find(|s| {
            s.requires.map_or(true, |r| r == current)
                && self.detector.announces_creation(s.kind, response)
        }) else {
            return AdvanceOutcome {
                text: response.to_owned(),
                transition: None,
            };
        };

        let entity_id = self.detector.extract_id(step.kind, response);
        if entity_id.is_none() {
            tracing::debug!(
                conversation_id,
                kind = step.kind.as_str(),
                "creation announced without a recognisable id"
            );
        }

        if persist {
            let state = states.entry(conversation_id.to_owned()).or_default();
            state.insert(keys::CURRENT_STEP.into(), step.to.as_str().into());
            if let Some(id) = &entity_id {
                state.insert(step.id_key.into(), id.clone());
            }
        }
        drop(states);

        let continuation_appended = !self.detector.has_forward_phrase(step.kind, response);
        let mut text = response.to_owned();
        if continuation_appended {
            text.push_str(step.continuation);
        }

        TraceEvent::WorkflowAdvanced {
            conversation_id: conversation_id.to_owned(),
            from: current.as_str().into(),
            to: step.to.as_str().into(),
            entity_id: entity_id.clone(),
            continuation_appended,
        }
        .emit();

        AdvanceOutcome {
            text,
            transition: Some(Transition {
                kind: step.kind,
                from: current,
                to: step.to,
                entity_id,
                continuation_appended,
            }),
        }
    }

    /// Clear every state key for the conversation.
    pub fn reset(&self, conversation_id: &str) {
        let conversation_id = normalize_conversation_id(conversation_id);
        if self.states.write().remove(conversation_id).is_some() {
            TraceEvent::WorkflowReset {
                conversation_id: conversation_id.to_owned(),
            }
            .emit();
        }
    }

    pub fn stage(&self, conversation_id: &str) -> WorkflowStage {
        stage_of(self.states.read().get(normalize_conversation_id(conversation_id)))
    }

    pub fn value(&self, conversation_id: &str, key: &str) -> Option<String> {
        self.states
            .read()
            .get(normalize_conversation_id(conversation_id))
            .and_then(|s| s.get(key).cloned())
    }

    /// Snapshot of every key stored for the conversation.
    pub fn state(&self, conversation_id: &str) -> BTreeMap<String, String> {
        self.states
            .read()
            .get(normalize_conversation_id(conversation_id))
            .cloned()
            .unwrap_or_default()
    }
}

fn stage_of(state: Option<&BTreeMap<String, String>>) -> WorkflowStage {
    state
        .and_then(|s| s.get(keys::CURRENT_STEP))
        .and_then(|v| WorkflowStage::parse(v))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> WorkflowEngine {
        WorkflowEngine::with_phrase_detector().unwrap()
    }

    const SESSION_CREATED: &str =
        "The OKR session has been created. Session ID: '3fa85f64-5717-4562-b3fc-2c963f66afa6'";

    #[test]
    fn session_creation_advances_and_appends_prompt() {
        let engine = engine();
        let out = engine.advance("c1", SESSION_CREATED);

        assert_eq!(engine.stage("c1"), WorkflowStage::CreatedSession);
        assert_eq!(
            engine.value("c1", keys::OKR_SESSION_ID).as_deref(),
            Some("3fa85f64-5717-4562-b3fc-2c963f66afa6")
        );
        assert_eq!(out.text, format!("{SESSION_CREATED}{}", prompts::CREATE_OBJECTIVE));
        let t = out.transition.unwrap();
        assert_eq!(t.kind, CreatedKind::Session);
        assert_eq!(t.from, WorkflowStage::None);
        assert!(t.continuation_appended);
    }

    #[test]
    fn session_prompt_skipped_when_response_mentions_objective() {
        let engine = engine();
        let text = "Your OKR session was created successfully. Shall we add an objective?";
        let out = engine.advance("c1", text);
        assert_eq!(out.text, text);
        assert_eq!(engine.stage("c1"), WorkflowStage::CreatedSession);
        // No id in the text; the transition still happens.
        assert_eq!(engine.value("c1", keys::OKR_SESSION_ID), None);
    }

    #[test]
    fn objective_requires_session_stage() {
        let engine = engine();
        let text = "The objective was created. Objective ID: 'abc-123'";
        let out = engine.advance("c1", text);
        assert_eq!(out.text, text);
        assert!(out.transition.is_none());
        assert_eq!(engine.stage("c1"), WorkflowStage::None);
    }

    #[test]
    fn full_walk_to_terminal_stage() {
        let engine = engine();
        engine.advance("c1", SESSION_CREATED);

        let out = engine.advance("c1", "Objective created. Objective ID: 'abc-123'");
        assert!(out.text.ends_with(prompts::CREATE_KEY_RESULT));

        let out = engine.advance("c1", "The key result was created. Key Result ID: 'beef-1'");
        assert!(out.text.ends_with(prompts::CREATE_TASK));
        assert_eq!(engine.stage("c1"), WorkflowStage::CreatedKeyResult);

        let out = engine.advance("c1", "The task was created. Task ID: 'f00d'");
        assert!(out.text.ends_with(prompts::WRAP_UP));
        assert_eq!(engine.stage("c1"), WorkflowStage::CreatedKeyResultTask);

        let state = engine.state("c1");
        assert_eq!(state[keys::OBJECTIVE_ID], "abc-123");
        assert_eq!(state[keys::KEY_RESULT_ID], "beef-1");
        assert_eq!(state[keys::KEY_RESULT_TASK_ID], "f00d");
    }

    #[test]
    fn terminal_stage_ignores_further_creations() {
        let engine = engine();
        engine.advance("c1", SESSION_CREATED);
        engine.advance("c1", "Objective created. Objective ID: 'a'");
        engine.advance("c1", "Key Result created. Key Result ID: 'b'");
        engine.advance("c1", "Task created. Task ID: 'c'");

        let out = engine.advance("c1", "Another task was created. Task ID: 'd'");
        assert!(out.transition.is_none());
        assert_eq!(engine.value("c1", keys::KEY_RESULT_TASK_ID).as_deref(), Some("c"));
    }

    #[test]
    fn unrelated_text_is_unchanged() {
        let engine = engine();
        let out = engine.advance("c1", "Hello! How can I help with your OKRs?");
        assert_eq!(out.text, "Hello! How can I help with your OKRs?");
        assert!(out.transition.is_none());
        assert!(engine.state("c1").is_empty());
    }

    #[test]
    fn reset_clears_state() {
        let engine = engine();
        engine.advance("c1", SESSION_CREATED);
        engine.reset("c1");
        assert_eq!(engine.stage("c1"), WorkflowStage::None);
        assert!(engine.state("c1").is_empty());
        // Resetting an unknown conversation is a no-op.
        engine.reset("missing");
    }

    #[test]
    fn padded_ids_share_state() {
        let engine = engine();
        engine.advance(" c1 ", SESSION_CREATED);
        assert_eq!(engine.stage("c1"), WorkflowStage::CreatedSession);

        engine.reset("c1\n");
        assert!(engine.state(" c1 ").is_empty());
    }

    #[test]
    fn conversations_are_independent() {
        let engine = engine();
        engine.advance("c1", SESSION_CREATED);
        assert_eq!(engine.stage("c2"), WorkflowStage::None);
    }

    #[test]
    fn blank_conversation_id_is_not_persisted() {
        let engine = engine();
        let out = engine.advance("  ", SESSION_CREATED);
        assert!(out.transition.is_some());
        assert!(engine.state("  ").is_empty());
    }

    #[test]
    fn custom_detector_drives_the_same_steps() {
        struct Always;
        impl ResponseDetector for Always {
            fn announces_creation(&self, kind: CreatedKind, _: &str) -> bool {
                kind == CreatedKind::Session
            }
            fn extract_id(&self, _: CreatedKind, _: &str) -> Option<String> {
                Some("fixed".into())
            }
            fn has_forward_phrase(&self, _: CreatedKind, _: &str) -> bool {
                true
            }
        }

        let engine = WorkflowEngine::new(Arc::new(Always));
        let out = engine.advance("c1", "anything");
        assert_eq!(out.text, "anything");
        assert_eq!(engine.value("c1", keys::OKR_SESSION_ID).as_deref(), Some("fixed"));
    }
}
