use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the OpenAI-compatible completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider id used in logs and error messages.
    #[serde(default = "d_provider_id")]
    pub provider_id: String,
    /// Base URL, e.g. `https://api.openai.com/v1` or an Azure resource URL.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Model name, or deployment name when `azure = true`.
    #[serde(default = "d_model")]
    pub model: String,
    /// Use the Azure OpenAI URL layout and `api-key` header.
    #[serde(default)]
    pub azure: bool,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Per-call timeout. Applies to every completion call, including each
    /// chunk call of the document pipeline.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_id: d_provider_id(),
            base_url: d_base_url(),
            api_key_env: d_api_key_env(),
            model: d_model(),
            azure: false,
            temperature: None,
            max_tokens: None,
            timeout_ms: d_timeout_ms(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_provider_id() -> String {
    "openai".into()
}
fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn d_model() -> String {
    "gpt-4o".into()
}
fn d_timeout_ms() -> u64 {
    60_000
}
