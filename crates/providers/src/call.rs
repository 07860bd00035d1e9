//! Bounded completion calls.
//!
//! Every call the engine makes goes through [`complete_text`], which races
//! the provider against the caller's cancellation token and a timeout.
//! There is no retry: a failed call is reported to the caller as-is.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use oa_domain::error::{Error, Result};
use oa_domain::trace::TraceEvent;

use crate::traits::{CompletionProvider, CompletionRequest};

/// Cancellation and timeout applied to a completion call.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl CallOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Run one completion call and return its text.
pub async fn complete_text(
    provider: &dyn CompletionProvider,
    req: CompletionRequest,
    opts: &CallOptions,
) -> Result<String> {
    let message_count = req.messages.len();
    let start = Instant::now();

    let result = tokio::select! {
        biased;
        _ = opts.cancel.cancelled() => Err(Error::Cancelled(format!(
            "completion call to {} cancelled",
            provider.provider_id()
        ))),
        outcome = tokio::time::timeout(opts.timeout, provider.complete(req)) => match outcome {
            Ok(response) => response.map(|r| r.content),
            Err(_) => Err(Error::Timeout(format!(
                "{} did not respond within {}ms",
                provider.provider_id(),
                opts.timeout.as_millis()
            ))),
        },
    };

    TraceEvent::CompletionRequest {
        provider: provider.provider_id().to_owned(),
        model: provider.model().to_owned(),
        messages: message_count,
        duration_ms: start.elapsed().as_millis() as u64,
        ok: result.is_ok(),
    }
    .emit();

    if let Err(e) = &result {
        tracing::warn!(provider = provider.provider_id(), error = %e, "completion call failed");
    }

    result
}
