pub mod pipeline;
pub mod prompts;

pub use pipeline::{AnswerMode, DocumentAnswer, DocumentPipeline};
