//! `okr-assistant chat`: interactive REPL.
//!
//! Each line is one turn. Slash commands manage the conversation, show
//! workflow state, and run document questions.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use oa_domain::config::Config;

use crate::bootstrap;
use crate::runtime::TurnInput;
use crate::state::Assistant;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    config: Arc<Config>,
    mut conversation_id: String,
    user_id: Option<String>,
) -> anyhow::Result<()> {
    let assistant = bootstrap::build_assistant(config)?;
    bootstrap::spawn_background_tasks(&assistant);
    let assistant = &assistant;

    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".okr-assistant")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    // Banner on stderr keeps stdout for replies.
    eprintln!("OKR assistant chat");
    eprintln!("Conversation: {conversation_id}  |  Type /help for commands, Ctrl+D to exit");
    eprintln!();

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    if handle_slash_command(
                        assistant,
                        trimmed,
                        &mut conversation_id,
                        user_id.as_deref(),
                    )
                    .await
                    {
                        break;
                    }
                    continue;
                }

                let mut input = TurnInput::new(&conversation_id, trimmed);
                if let Some(user) = &user_id {
                    input = input.from_user(user);
                }
                let result = with_ctrl_c(|cancel| async move {
                    assistant.handle_turn(input, &cancel).await
                })
                .await;
                match result {
                    Ok(outcome) => {
                        println!("{}\n", outcome.reply);
                        if let Some(t) = outcome.transition {
                            eprintln!("\x1B[2m[workflow: {} → {}]\x1B[0m", t.from, t.to);
                        }
                    }
                    Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Goodbye!");
    Ok(())
}

/// Run `f` with a token that Ctrl+C cancels.
async fn with_ctrl_c<F, Fut, T>(f: F) -> T
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let cancel = CancellationToken::new();
    let listener = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let out = f(cancel).await;
    listener.abort();
    out
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command. Returns `true` if the REPL should exit.
async fn handle_slash_command(
    assistant: &Assistant,
    input: &str,
    conversation_id: &mut String,
    user_id: Option<&str>,
) -> bool {
    let (cmd, arg) = match input.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (input, ""),
    };

    match cmd {
        "/exit" | "/quit" => return true,

        "/conversation" => {
            if arg.is_empty() {
                eprintln!("Current conversation: {conversation_id}");
                eprintln!("Usage: /conversation <id>");
            } else {
                *conversation_id = arg.to_string();
                eprintln!("Switched to conversation: {conversation_id}");
            }
        }

        "/reset" => {
            assistant.reset_conversation(conversation_id);
            eprintln!("Conversation {conversation_id} cleared.");
        }

        "/state" => {
            let state = assistant.workflow.state(conversation_id);
            match serde_json::to_string_pretty(&state) {
                Ok(json) => eprintln!("{json}"),
                Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
            }
        }

        "/transcript" => match assistant.conversations.get(conversation_id) {
            Some(history) => {
                let transcript = history.read().to_linear_transcript();
                for entry in &transcript.entries {
                    eprintln!("[{}] {}", entry.role.as_str(), entry.content);
                }
            }
            None => eprintln!("No messages in {conversation_id} yet."),
        },

        "/doc" => {
            let Some((path, question)) = arg.split_once(' ') else {
                eprintln!("Usage: /doc <path> <question>");
                return false;
            };
            let document = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("\x1B[31mreading {path}: {e}\x1B[0m");
                    return false;
                }
            };
            let id = conversation_id.clone();
            let result = with_ctrl_c(|cancel| async move {
                assistant
                    .ask_document(&id, user_id, &document, question.trim(), &cancel)
                    .await
            })
            .await;
            match result {
                Ok(answer) => println!("{}\n", answer.text),
                Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
            }
        }

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /conversation <id>      Switch to another conversation");
            eprintln!("  /reset                  Clear this conversation and its workflow");
            eprintln!("  /state                  Show workflow state");
            eprintln!("  /transcript             Show the transcript sent to the model");
            eprintln!("  /doc <path> <question>  Ask a question about a text file");
            eprintln!("  /exit, /quit            Exit the chat");
            eprintln!("  /help                   Show this help");
        }

        other => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }

    false
}
