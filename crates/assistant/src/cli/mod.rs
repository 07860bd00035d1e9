pub mod ask;
pub mod chat;
pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// OKR assistant: guided OKR creation and document Q&A over a chat
/// completion endpoint.
#[derive(Debug, Parser)]
#[command(name = "okr-assistant", version, about)]
pub struct Cli {
    /// Emit JSON logs (default filter `info,oa_assistant=debug`) instead of
    /// compact warnings.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat (default when no subcommand is given).
    Chat {
        /// Conversation id.
        #[arg(long, default_value = "cli:chat")]
        conversation: String,
        /// User id recorded on every message.
        #[arg(long)]
        user: Option<String>,
    },
    /// Ask a single question about a document and print the answer.
    Ask {
        /// Path to a text document.
        #[arg(long)]
        file: PathBuf,
        /// User id recorded on the question.
        #[arg(long)]
        user: Option<String>,
        /// The question.
        question: String,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `OA_CONFIG` (or `config.toml`).
/// A missing file yields the defaults. Returns the config and the path
/// that was used.
pub fn load_config() -> anyhow::Result<(oa_domain::config::Config, String)> {
    let config_path = std::env::var("OA_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        oa_domain::config::Config::default()
    };

    Ok((config, config_path))
}
