//! Guided OKR creation workflow.
//!
//! Watches assistant responses for "X was created" announcements, records
//! the created ids per conversation, and nudges the user towards the next
//! step (session → objective → key result → task).

pub mod detector;
pub mod engine;
pub mod prompts;
pub mod stage;

pub use detector::{CreatedKind, PhraseDetector, ResponseDetector};
pub use engine::{keys, AdvanceOutcome, Transition, WorkflowEngine};
pub use stage::WorkflowStage;
