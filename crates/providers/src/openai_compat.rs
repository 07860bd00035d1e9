//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Azure OpenAI, Ollama, vLLM, LM Studio and any other
//! endpoint that follows the OpenAI chat completions contract.

use std::time::Duration;

use serde_json::Value;

use oa_domain::config::LlmConfig;
use oa_domain::error::{Error, Result};
use oa_domain::message::{ChatMessage, Role};

use crate::traits::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::util::{from_reqwest, resolve_api_key};

const AZURE_API_VERSION: &str = "2024-10-21";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A completion provider for any OpenAI-compatible API endpoint.
///
/// Azure OpenAI uses the same wire format with a different URL pattern
/// (`/openai/deployments/{model}/chat/completions`) and auth header
/// (`api-key` instead of `Authorization: Bearer`).
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
    is_azure: bool,
}

impl OpenAiCompatProvider {
    /// Create a provider from the `[llm]` config section. The API key is
    /// read from the configured environment variable.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.api_key_env)?;

        // The per-call deadline is enforced by the caller; this is only a
        // backstop for connections that hang below the HTTP layer.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms.saturating_mul(2)))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.provider_id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            client,
            is_azure: cfg.azure,
        })
    }

    fn chat_url(&self) -> String {
        if self.is_azure {
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version={AZURE_API_VERSION}",
                self.base_url, self.model
            )
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(url).header("Content-Type", "application/json");
        if self.is_azure {
            builder.header("api-key", &self.api_key)
        } else {
            builder.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }

    fn build_chat_body(&self, req: &CompletionRequest) -> Value {
        let messages: Vec<Value> = req.messages.iter().map(msg_to_openai).collect();

        let mut body = serde_json::json!({ "messages": messages });

        // Azure embeds the deployment name in the URL.
        if !self.is_azure {
            body["model"] = Value::String(self.model.clone());
        }
        if let Some(temp) = req.temperature.or(self.temperature) {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max) = req.max_tokens.or(self.max_tokens) {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tool entries carry no tool-call id in a linear transcript, so they are
/// sent as system context rather than as `tool` messages.
fn msg_to_openai(msg: &ChatMessage) -> Value {
    match msg.role {
        Role::Tool => serde_json::json!({
            "role": "system",
            "content": format!("Tool output:\n{}", msg.content),
        }),
        role => serde_json::json!({
            "role": role.as_str(),
            "content": msg.content,
        }),
    }
}

fn parse_chat_response(body: &Value) -> Result<CompletionResponse> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: "openai_compat".into(),
            message: "no choices in response".into(),
        })?;

    let message = choice.get("message").ok_or_else(|| Error::Provider {
        provider: "openai_compat".into(),
        message: "no message in choice".into(),
    })?;

    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(String::from);

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    Ok(CompletionResponse {
        content,
        model,
        finish_reason,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait impl
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse> {
        let url = self.chat_url();
        let body = self.build_chat_body(&req);

        tracing::debug!(provider = %self.id, url = %url, "openai_compat chat request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_chat_response(&resp_json)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(azure: bool) -> OpenAiCompatProvider {
        OpenAiCompatProvider {
            id: "test".into(),
            base_url: "https://example.test/v1".into(),
            api_key: "sk-test".into(),
            model: "gpt-4o".into(),
            temperature: Some(0.3),
            max_tokens: None,
            client: reqwest::Client::new(),
            is_azure: azure,
        }
    }

    #[test]
    fn standard_body_includes_model_and_defaults() {
        let req = CompletionRequest::new(vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hi"),
        ]);
        let body = provider(false).build_chat_body(&req);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn azure_url_and_body_omit_model() {
        let p = provider(true);
        assert_eq!(
            p.chat_url(),
            "https://example.test/v1/openai/deployments/gpt-4o/chat/completions?api-version=2024-10-21"
        );
        let body = p.build_chat_body(&CompletionRequest::new(vec![ChatMessage::user("x")]));
        assert!(body.get("model").is_none());
    }

    #[test]
    fn tool_entries_become_system_context() {
        let v = msg_to_openai(&ChatMessage::new(Role::Tool, "[]"));
        assert_eq!(v["role"], "system");
        assert_eq!(v["content"], "Tool output:\n[]");
    }

    #[test]
    fn parse_response_extracts_content() {
        let body = serde_json::json!({
            "model": "gpt-4o-2024",
            "choices": [{
                "message": {"role": "assistant", "content": "Done."},
                "finish_reason": "stop"
            }]
        });
        let resp = parse_chat_response(&body).unwrap();
        assert_eq!(resp.content, "Done.");
        assert_eq!(resp.model, "gpt-4o-2024");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn parse_response_without_choices_is_error() {
        let err = parse_chat_response(&serde_json::json!({"choices": []})).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
