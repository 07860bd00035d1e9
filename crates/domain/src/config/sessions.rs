use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Conversation store lifecycle rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Idle timeout in minutes. Conversations with no activity for longer
    /// than this are dropped by the pruning sweep. `None` keeps every
    /// conversation for the lifetime of the process.
    #[serde(default)]
    pub idle_minutes: Option<u32>,

    /// How often the pruning sweep runs, in seconds.
    #[serde(default = "d_prune_interval")]
    pub prune_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_minutes: None,
            prune_interval_secs: d_prune_interval(),
        }
    }
}

impl SessionsConfig {
    pub fn prune_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.prune_interval_secs.max(1))
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_prune_interval() -> u64 {
    300
}
