//! Document question answering.
//!
//! Small documents are inlined into the system message and answered with a
//! single completion call. Larger ones are chunked, each chunk is reduced to
//! its key OKR facts by an independent call, and a final call consolidates
//! the per-chunk outputs into one answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use oa_contextpack::{
    augment_system_message, CharRatioEstimator, Chunker, LineChunker, TokenEstimator,
};
use oa_domain::config::IngestionConfig;
use oa_domain::error::Result;
use oa_domain::message::ChatMessage;
use oa_domain::trace::TraceEvent;
use oa_providers::{complete_text, CallOptions, CompletionProvider, CompletionRequest};

use crate::prompts;

/// Which path the pipeline took for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    /// The document was empty; no completion call was made.
    Empty,
    /// One augmented completion call.
    SingleShot,
    /// `chunks` extraction calls plus one consolidation call.
    Chunked { chunks: usize },
    /// A completion call failed; the text describes the error.
    Failed,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::SingleShot => "single_shot",
            Self::Chunked { .. } => "chunked",
            Self::Failed => "failed",
        }
    }
}

/// The pipeline's result. `text` is always suitable to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentAnswer {
    pub text: String,
    pub mode: AnswerMode,
}

pub struct DocumentPipeline {
    provider: Arc<dyn CompletionProvider>,
    estimator: Arc<dyn TokenEstimator>,
    chunker: Arc<dyn Chunker>,
    config: IngestionConfig,
    timeout: Duration,
}

impl DocumentPipeline {
    /// Pipeline with the default character-ratio estimator and line chunker.
    pub fn new(provider: Arc<dyn CompletionProvider>, config: IngestionConfig) -> Self {
        Self {
            provider,
            estimator: Arc::new(CharRatioEstimator::new(config.chars_per_token)),
            chunker: Arc::new(LineChunker::new(config.chars_per_token)),
            config,
            timeout: CallOptions::default().timeout,
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    /// Per-call timeout applied to every completion call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Answer `query` about `document`.
    ///
    /// Never fails: completion errors, timeouts and cancellation are turned
    /// into a user-facing message with [`AnswerMode::Failed`].
    pub async fn process(
        &self,
        base_system: &str,
        document: &str,
        query: &str,
        cancel: &CancellationToken,
    ) -> DocumentAnswer {
        if document.trim().is_empty() {
            return DocumentAnswer {
                text: prompts::NO_CONTENT.to_owned(),
                mode: AnswerMode::Empty,
            };
        }

        let start = Instant::now();
        let opts = CallOptions::new(self.timeout).with_cancel(cancel.clone());
        let estimated_tokens = self.estimator.estimate(document);

        let result = if estimated_tokens <= self.config.single_shot_max_tokens {
            self.single_shot(base_system, document, query, &opts).await
        } else {
            self.chunked(base_system, document, query, &opts).await
        };

        let answer = match result {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, estimated_tokens, "document processing failed");
                DocumentAnswer {
                    text: prompts::error_message(&e),
                    mode: AnswerMode::Failed,
                }
            }
        };

        TraceEvent::DocumentProcessed {
            mode: answer.mode.as_str().to_owned(),
            estimated_tokens,
            chunks: match answer.mode {
                AnswerMode::Chunked { chunks } => chunks,
                _ => 0,
            },
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        answer
    }

    async fn single_shot(
        &self,
        base_system: &str,
        document: &str,
        query: &str,
        opts: &CallOptions,
    ) -> Result<DocumentAnswer> {
        let prompt = augment_system_message(
            self.estimator.as_ref(),
            base_system,
            document,
            self.config.max_context_tokens,
        );
        if prompt.truncated {
            tracing::debug!(
                max_context_tokens = self.config.max_context_tokens,
                "document truncated to fit the context budget"
            );
        }

        let req = CompletionRequest::new(vec![
            ChatMessage::system(prompt.system_message),
            ChatMessage::user(query),
        ]);
        let text = complete_text(self.provider.as_ref(), req, opts).await?;

        Ok(DocumentAnswer {
            text,
            mode: AnswerMode::SingleShot,
        })
    }

    async fn chunked(
        &self,
        base_system: &str,
        document: &str,
        query: &str,
        opts: &CallOptions,
    ) -> Result<DocumentAnswer> {
        let chunks = self
            .chunker
            .chunk(document, self.config.chunk_target_tokens);
        let total = chunks.len();
        tracing::debug!(
            chunks = total,
            concurrency = self.config.chunk_concurrency,
            "processing document in chunks"
        );

        // `buffered` keeps outputs in chunk order regardless of completion order.
        let outputs: Vec<String> = stream::iter(chunks.iter().enumerate().map(|(i, chunk)| {
            let req = CompletionRequest::new(vec![
                ChatMessage::system(prompts::EXTRACTION_INSTRUCTION),
                ChatMessage::user(prompts::chunk_user_message(i + 1, total, chunk)),
            ]);
            complete_text(self.provider.as_ref(), req, opts)
        }))
        .buffered(self.config.chunk_concurrency.max(1))
        .try_collect()
        .await?;

        let req = CompletionRequest::new(vec![
            ChatMessage::system(format!(
                "{base_system}\n\n{}",
                prompts::CONSOLIDATION_PREAMBLE
            )),
            ChatMessage::user(prompts::consolidation_user_message(query, &outputs)),
        ]);
        let text = complete_text(self.provider.as_ref(), req, opts).await?;

        Ok(DocumentAnswer {
            text,
            mode: AnswerMode::Chunked { chunks: total },
        })
    }
}
