//! `okr-assistant ask`: one-shot document question.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use oa_domain::config::Config;
use oa_ingestion::AnswerMode;

use crate::bootstrap;

pub async fn ask(
    config: Arc<Config>,
    file: &Path,
    user_id: Option<&str>,
    question: &str,
) -> anyhow::Result<()> {
    let document = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let assistant = bootstrap::build_assistant(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let answer = assistant
        .ask_document("cli:ask", user_id, &document, question, &cancel)
        .await;
    ctrl_c.abort();
    let answer = answer?;

    println!("{}", answer.text);
    if answer.mode == AnswerMode::Failed {
        anyhow::bail!("document could not be processed");
    }
    Ok(())
}
