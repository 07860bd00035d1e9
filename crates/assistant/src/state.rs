use std::sync::Arc;
use std::time::Duration;

use oa_domain::config::Config;
use oa_domain::error::Result;
use oa_ingestion::DocumentPipeline;
use oa_providers::CompletionProvider;
use oa_sessions::ConversationStore;
use oa_workflow::WorkflowEngine;

use crate::runtime::session_lock::ConversationLockMap;

/// Shared assistant state. Cheap to clone; every field is behind an `Arc`.
///
/// Fields are grouped by concern:
/// - **Core services**: config, completion provider
/// - **Conversation state**: histories, workflow state, run locks
/// - **Documents**: the ingestion pipeline
#[derive(Clone)]
pub struct Assistant {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub provider: Arc<dyn CompletionProvider>,

    // ── Conversation state ────────────────────────────────────────────
    pub conversations: Arc<ConversationStore>,
    pub workflow: Arc<WorkflowEngine>,
    pub conversation_locks: Arc<ConversationLockMap>,

    // ── Documents ─────────────────────────────────────────────────────
    pub documents: Arc<DocumentPipeline>,
}

impl Assistant {
    /// Wire up every component around `provider`.
    ///
    /// Fails only when the workflow's response patterns do not compile.
    pub fn new(config: Arc<Config>, provider: Arc<dyn CompletionProvider>) -> Result<Self> {
        let documents = DocumentPipeline::new(provider.clone(), config.ingestion.clone())
            .with_timeout(Duration::from_millis(config.llm.timeout_ms));

        Ok(Self {
            provider,
            conversations: Arc::new(ConversationStore::new()),
            workflow: Arc::new(WorkflowEngine::with_phrase_detector()?),
            conversation_locks: Arc::new(ConversationLockMap::new()),
            documents: Arc::new(documents),
            config,
        })
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.config.llm.timeout_ms)
    }
}
