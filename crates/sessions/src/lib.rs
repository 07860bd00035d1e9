//! Conversation state for the OKR assistant.
//!
//! Each conversation owns an append-only message history plus an index of
//! the business entities (sessions, objectives, key results, ...) its
//! messages created or touched. The index lets the assistant resolve loose
//! references like "the first one" or "the previous objective" to concrete
//! ids when the history is linearized for the completion service.
//!
//! Histories live in a process-local [`ConversationStore`]; nothing here is
//! persisted across restarts.

pub mod entity;
pub mod history;
mod resolver;
pub mod store;
pub mod transcript;

pub use entity::{EntityIndex, EntityReference};
pub use history::ConversationHistory;
pub use store::{ConversationStore, SharedHistory};
pub use transcript::LinearTranscript;
