//! One conversational turn: record the user message, linearize the history,
//! ask the completion service, let the workflow engine inspect the reply,
//! and record the (possibly extended) reply. A reply that announces a
//! created entity is stored tagged with it, so later turns can refer back.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use oa_domain::error::{Error, Result};
use oa_domain::message::{keys, normalize_conversation_id, ChatMessage, Message};
use oa_ingestion::{AnswerMode, DocumentAnswer};
use oa_providers::{complete_text, CallOptions, CompletionRequest};
use oa_workflow::{AdvanceOutcome, Transition, WorkflowStage};

use crate::state::Assistant;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn input / outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct TurnInput {
    pub conversation_id: String,
    /// Stored as the `UserId` metadata of the user message.
    pub user_id: Option<String>,
    pub message: String,
}

impl TurnInput {
    pub fn new(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: None,
            message: message.into(),
        }
    }

    pub fn from_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The reply shown to the user, including any workflow continuation.
    pub reply: String,
    /// Workflow stage after the turn.
    pub stage: WorkflowStage,
    /// The workflow step this reply triggered, if any.
    pub transition: Option<Transition>,
    /// `false` when the reply was not kept in the history (code blocks).
    pub stored: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl Assistant {
    /// Run one turn for `input.conversation_id`.
    ///
    /// Turns on the same conversation are serialized. A failed completion
    /// call leaves the user message in the history, the workflow state
    /// untouched, and is returned as the error.
    pub async fn handle_turn(
        &self,
        input: TurnInput,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let conversation_id = normalize_conversation_id(&input.conversation_id).to_owned();
        let _permit = self
            .conversation_locks
            .acquire(&conversation_id)
            .await
            .map_err(|e| Error::Other(e.to_string()))?;
        let start = Instant::now();

        let history = self.conversations.get_or_create(&conversation_id);

        let user_message = user_message(&input.message, input.user_id.as_deref());
        let transcript = {
            let mut history = history.write();
            history.add_message(user_message);
            history.to_linear_transcript()
        };

        let mut messages = Vec::with_capacity(transcript.len() + 1);
        messages.push(ChatMessage::system(&self.config.assistant.system_prompt));
        messages.extend(transcript.entries);

        let req = CompletionRequest {
            messages,
            temperature: self.config.llm.temperature,
            max_tokens: self.config.llm.max_tokens,
        };
        let opts = CallOptions::new(self.call_timeout()).with_cancel(cancel.clone());
        let response = complete_text(self.provider.as_ref(), req, &opts).await?;

        let advanced = self.workflow.advance(&conversation_id, &response);
        let stored = history.write().add_message(reply_message(&advanced));

        tracing::debug!(
            conversation_id = %conversation_id,
            duration_ms = start.elapsed().as_millis() as u64,
            reply_len = advanced.text.len(),
            stored,
            "turn completed"
        );

        Ok(TurnOutcome {
            stage: self.workflow.stage(&conversation_id),
            reply: advanced.text,
            transition: advanced.transition,
            stored,
        })
    }

    /// Answer `query` about `document` within a conversation.
    ///
    /// The question (with `user_id` as its `UserId`, when given) and a
    /// successful answer are recorded in the history; the document itself
    /// is not. Pipeline failures come back as an answer with
    /// [`AnswerMode::Failed`], not as an error.
    pub async fn ask_document(
        &self,
        conversation_id: &str,
        user_id: Option<&str>,
        document: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<DocumentAnswer> {
        let conversation_id = normalize_conversation_id(conversation_id);
        let _permit = self
            .conversation_locks
            .acquire(conversation_id)
            .await
            .map_err(|e| Error::Other(e.to_string()))?;

        let history = self.conversations.get_or_create(conversation_id);
        history.write().add_message(user_message(query, user_id));

        let answer = self
            .documents
            .process(&self.config.assistant.system_prompt, document, query, cancel)
            .await;

        if matches!(answer.mode, AnswerMode::SingleShot | AnswerMode::Chunked { .. }) {
            history.write().add_message(Message::assistant(&answer.text));
        }

        Ok(answer)
    }

    /// Clear the conversation's history and workflow state.
    pub fn reset_conversation(&self, conversation_id: &str) {
        let conversation_id = normalize_conversation_id(conversation_id);
        self.conversations.reset(conversation_id);
        self.workflow.reset(conversation_id);
    }

    /// Drop conversations idle for longer than `max_idle`, along with their
    /// workflow state. Conversations with a turn running or queued are kept.
    /// Returns the number removed.
    pub fn prune_idle_conversations(&self, max_idle: chrono::Duration) -> usize {
        let locks = &self.conversation_locks;
        let removed = self
            .conversations
            .prune_idle(max_idle, |id| locks.is_active(id));
        for id in &removed {
            self.workflow.reset(id);
        }
        removed.len()
    }
}

fn user_message(text: &str, user_id: Option<&str>) -> Message {
    let message = Message::user(text);
    match user_id.filter(|u| !u.trim().is_empty()) {
        Some(user_id) => message.with_metadata(keys::USER_ID, user_id),
        None => message,
    }
}

/// The reply as stored, tagged with the entity it announced creating.
fn reply_message(advanced: &AdvanceOutcome) -> Message {
    let message = Message::assistant(&advanced.text);
    let Some(transition) = &advanced.transition else {
        return message;
    };
    match transition.entity_id.as_deref() {
        Some(id) => message
            .with_entity(transition.kind.entity_type(), id)
            .with_operation("Create"),
        None => message,
    }
}
