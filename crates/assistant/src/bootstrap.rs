//! Construction of the shared [`Assistant`] from configuration, plus the
//! background sweeps a long-lived process runs.

use std::sync::Arc;

use anyhow::Context;

use oa_domain::config::Config;
use oa_providers::{CompletionProvider, OpenAiCompatProvider};

use crate::state::Assistant;

/// Build the assistant against the configured OpenAI-compatible endpoint.
pub fn build_assistant(config: Arc<Config>) -> anyhow::Result<Assistant> {
    let provider = OpenAiCompatProvider::from_config(&config.llm)
        .with_context(|| format!("initializing provider '{}'", config.llm.provider_id))?;
    tracing::info!(
        provider = provider.provider_id(),
        model = provider.model(),
        azure = config.llm.azure,
        "completion provider ready"
    );

    Assistant::new(config, Arc::new(provider)).context("building assistant state")
}

/// Spawn the periodic maintenance loop: idle conversation pruning (when
/// `sessions.idle_minutes` is set) and run-lock cleanup.
pub fn spawn_background_tasks(assistant: &Assistant) {
    let assistant = assistant.clone();
    let sessions = assistant.config.sessions.clone();

    match sessions.idle_minutes {
        Some(minutes) => tracing::info!(
            idle_minutes = minutes,
            interval_secs = sessions.prune_interval().as_secs(),
            "idle conversation pruning enabled"
        ),
        None => tracing::info!("idle conversation pruning disabled (no sessions.idle_minutes)"),
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sessions.prune_interval());
        loop {
            interval.tick().await;
            if let Some(minutes) = sessions.idle_minutes {
                assistant.prune_idle_conversations(chrono::Duration::minutes(i64::from(minutes)));
            }
            assistant.conversation_locks.prune_idle();
        }
    });
}
