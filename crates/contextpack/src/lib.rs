//! Context sizing for completion calls: token estimation, chunking of
//! oversized text, and fitting a document into a system message under a
//! token budget.

pub mod chunker;
pub mod tokens;
pub mod truncation;

pub use chunker::{Chunker, LineChunker};
pub use tokens::{CharRatioEstimator, TokenEstimator};
pub use truncation::{augment_system_message, truncate_to_tokens, AugmentedPrompt};
