pub mod call;
pub mod openai_compat;
pub mod scripted;
pub mod traits;
pub(crate) mod util;

// Re-exports for convenience.
pub use call::{complete_text, CallOptions};
pub use openai_compat::OpenAiCompatProvider;
pub use scripted::ScriptedProvider;
pub use traits::{CompletionProvider, CompletionRequest, CompletionResponse};
