use serde::Serialize;

/// Structured trace events emitted across all OKR assistant crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ConversationCreated {
        conversation_id: String,
    },
    ConversationReset {
        conversation_id: String,
        messages_cleared: usize,
    },
    ConversationRemoved {
        conversation_id: String,
    },
    ConversationsPruned {
        removed: usize,
        remaining: usize,
    },
    MessageDropped {
        conversation_id: String,
        reason: String,
    },
    CompletionRequest {
        provider: String,
        model: String,
        messages: usize,
        duration_ms: u64,
        ok: bool,
    },
    DocumentProcessed {
        mode: String,
        estimated_tokens: usize,
        chunks: usize,
        duration_ms: u64,
    },
    WorkflowAdvanced {
        conversation_id: String,
        from: String,
        to: String,
        entity_id: Option<String>,
        continuation_appended: bool,
    },
    WorkflowReset {
        conversation_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "oa_event");
    }
}
