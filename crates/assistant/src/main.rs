use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use oa_assistant::cli::{load_config, Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        init_tracing();
    } else {
        init_cli_tracing();
    }

    match cli.command {
        // Default to chat when no subcommand is given.
        None => {
            let (config, _) = load_config()?;
            oa_assistant::cli::chat::chat(Arc::new(config), "cli:chat".into(), None).await
        }
        Some(Command::Chat { conversation, user }) => {
            let (config, _) = load_config()?;
            oa_assistant::cli::chat::chat(Arc::new(config), conversation, user).await
        }
        Some(Command::Ask { file, user, question }) => {
            let (config, _) = load_config()?;
            oa_assistant::cli::ask::ask(Arc::new(config), &file, user.as_deref(), &question).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = load_config()?;
            if !oa_assistant::cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _) = load_config()?;
            oa_assistant::cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("okr-assistant {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured JSON tracing on stderr, including the `oa_event` lines.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,oa_assistant=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();
}

/// Compact stderr-only tracing that defaults to `warn` so diagnostics do
/// not interleave with the conversation.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
