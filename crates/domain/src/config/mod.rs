mod assistant;
mod ingestion;
mod llm;
mod sessions;

pub use assistant::*;
pub use ingestion::*;
pub use llm::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl ConfigError {
    fn error(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: &str) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.llm.base_url.trim().is_empty() {
            errors.push(ConfigError::error("llm.base_url", "base_url must not be empty"));
        }
        if self.llm.model.trim().is_empty() {
            errors.push(ConfigError::error("llm.model", "model must not be empty"));
        }
        if self.llm.timeout_ms == 0 {
            errors.push(ConfigError::error(
                "llm.timeout_ms",
                "timeout must be greater than 0",
            ));
        }

        let ing = &self.ingestion;
        if ing.chars_per_token == 0 {
            errors.push(ConfigError::error(
                "ingestion.chars_per_token",
                "chars_per_token must be greater than 0",
            ));
        }
        if ing.chunk_target_tokens == 0 {
            errors.push(ConfigError::error(
                "ingestion.chunk_target_tokens",
                "chunk_target_tokens must be greater than 0",
            ));
        }
        if ing.chunk_concurrency == 0 {
            errors.push(ConfigError::error(
                "ingestion.chunk_concurrency",
                "chunk_concurrency must be at least 1",
            ));
        }
        if ing.max_context_tokens < ing.single_shot_max_tokens {
            errors.push(ConfigError::warning(
                "ingestion.max_context_tokens",
                "smaller than single_shot_max_tokens; single-shot documents will be truncated",
            ));
        }

        if self.sessions.idle_minutes == Some(0) {
            errors.push(ConfigError::warning(
                "sessions.idle_minutes",
                "0 prunes every conversation on each sweep",
            ));
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
