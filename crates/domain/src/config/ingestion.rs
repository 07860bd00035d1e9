use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Document ingestion
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Documents estimated at or below this many tokens are answered with a
    /// single completion call.
    #[serde(default = "d_4000")]
    pub single_shot_max_tokens: usize,
    /// Target size of each chunk for oversized documents.
    #[serde(default = "d_2000")]
    pub chunk_target_tokens: usize,
    /// Token budget for the augmented system message in single-shot mode.
    #[serde(default = "d_8000")]
    pub max_context_tokens: usize,
    /// Maximum chunk extraction calls in flight at once.
    #[serde(default = "d_4")]
    pub chunk_concurrency: usize,
    /// Characters per token used by the default estimator.
    #[serde(default = "d_4")]
    pub chars_per_token: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            single_shot_max_tokens: 4_000,
            chunk_target_tokens: 2_000,
            max_context_tokens: 8_000,
            chunk_concurrency: 4,
            chars_per_token: 4,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_8000() -> usize {
    8_000
}
fn d_4000() -> usize {
    4_000
}
fn d_2000() -> usize {
    2_000
}
fn d_4() -> usize {
    4
}
