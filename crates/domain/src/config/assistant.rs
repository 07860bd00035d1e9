use serde::{Deserialize, Serialize};

/// Persona and prompting for the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Base system message prepended to every conversation turn and used
    /// as the base for document Q&A.
    #[serde(default = "d_system_prompt")]
    pub system_prompt: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: d_system_prompt(),
        }
    }
}

fn d_system_prompt() -> String {
    "You are an OKR assistant. You help teams create OKR sessions, objectives, \
     key results and tasks, and you answer questions about their goals. \
     Be concise and refer to entities by name and ID."
        .into()
}
