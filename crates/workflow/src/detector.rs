//! Response text inspection.
//!
//! The engine only asks three questions of a response: does it announce
//! that an entity of some kind was created, what id did it report, and does
//! it already point the user at the next step. [`PhraseDetector`] answers
//! them with fixed phrases and patterns; a detector reading a structured
//! model output could replace it without touching the engine.

use regex::Regex;

use oa_domain::error::{Error, Result};

/// Entity kinds the workflow creates, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatedKind {
    Session,
    Objective,
    KeyResult,
    Task,
}

impl CreatedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Objective => "objective",
            Self::KeyResult => "key_result",
            Self::Task => "task",
        }
    }

    /// Entity type recorded in conversation histories for this kind.
    pub fn entity_type(self) -> &'static str {
        match self {
            Self::Session => "OkrSession",
            Self::Objective => "Objective",
            Self::KeyResult => "KeyResult",
            Self::Task => "KeyResultTask",
        }
    }
}

pub trait ResponseDetector: Send + Sync {
    /// Whether `text` announces that an entity of `kind` was created.
    fn announces_creation(&self, kind: CreatedKind, text: &str) -> bool;

    /// The id `text` reports for the created entity, if any.
    fn extract_id(&self, kind: CreatedKind, text: &str) -> Option<String>;

    /// Whether `text` already moves the user on from `kind` to the next step.
    fn has_forward_phrase(&self, kind: CreatedKind, text: &str) -> bool;
}

const COMPLETION_PHRASES: &[&str] = &["created successfully", "has been created", "successfully created"];

const SESSION_FORWARD: &[&str] = &["objective", "Objective", "STEP 2", "Next, let's"];
const OBJECTIVE_FORWARD: &[&str] = &["key result", "Key Result", "STEP 3", "Next, let's"];
const KEY_RESULT_FORWARD: &[&str] = &["task", "Task", "STEP 4", "Next, let's"];
const TASK_FORWARD: &[&str] = &["Next, let's", "next steps", "Next steps"];

/// Fixed phrase sets and id patterns. Substring checks are case-sensitive;
/// id patterns are not.
#[derive(Debug, Clone)]
pub struct PhraseDetector {
    session_id: Regex,
    objective_id: Regex,
    key_result_id: Regex,
    task_id: Regex,
}

impl PhraseDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            session_id: id_pattern("session")?,
            objective_id: id_pattern("objective")?,
            key_result_id: id_pattern("key result")?,
            task_id: id_pattern("task")?,
        })
    }

    fn pattern(&self, kind: CreatedKind) -> &Regex {
        match kind {
            CreatedKind::Session => &self.session_id,
            CreatedKind::Objective => &self.objective_id,
            CreatedKind::KeyResult => &self.key_result_id,
            CreatedKind::Task => &self.task_id,
        }
    }
}

/// `{noun}(?: with)? ID:? '?([0-9a-f-]+)'?`, case-insensitive.
fn id_pattern(noun: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?i){noun}(?: with)? ID:? '?([0-9a-f-]+)'?"))
        .map_err(|e| Error::Config(format!("invalid {noun} id pattern: {e}")))
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

impl ResponseDetector for PhraseDetector {
    fn announces_creation(&self, kind: CreatedKind, text: &str) -> bool {
        match kind {
            CreatedKind::Session => {
                text.contains("OKR session") && contains_any(text, COMPLETION_PHRASES)
            }
            CreatedKind::Objective => {
                contains_any(text, &["objective", "Objective"]) && text.contains("created")
            }
            CreatedKind::KeyResult => {
                contains_any(text, &["key result", "Key Result"]) && text.contains("created")
            }
            CreatedKind::Task => contains_any(text, &["task", "Task"]) && text.contains("created"),
        }
    }

    fn extract_id(&self, kind: CreatedKind, text: &str) -> Option<String> {
        self.pattern(kind)
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_owned())
    }

    fn has_forward_phrase(&self, kind: CreatedKind, text: &str) -> bool {
        let phrases = match kind {
            CreatedKind::Session => SESSION_FORWARD,
            CreatedKind::Objective => OBJECTIVE_FORWARD,
            CreatedKind::KeyResult => KEY_RESULT_FORWARD,
            CreatedKind::Task => TASK_FORWARD,
        };
        contains_any(text, phrases)
    }
}
