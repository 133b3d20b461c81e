//! Anthropic Messages API backend.
//!
//! A leading system turn lifts into the top-level `system` field, separate
//! from the message list. The API has no native multi-candidate support, so
//! n>1 is emulated with n sequential calls.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::router::Provider;
use super::types::{CompletionRequest, Role};
use super::{ChatBackend, LlmError};

const API_VERSION: &str = "2023-06-01";

/// Request body for `POST {base}/v1/messages`.
#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl MessagesResponse {
    /// Text of the first text block, if any.
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text.as_deref())
    }
}

fn build_body(request: &CompletionRequest) -> MessagesBody<'_> {
    let mut turns = request.conversation.as_slice();
    let mut system = None;

    if let Some(first) = turns.first() {
        if first.role.is_system() {
            system = Some(first.content.as_str());
            turns = &turns[1..];
        }
    }

    let messages = turns
        .iter()
        .filter(|turn| !turn.role.is_system())
        .map(|turn| WireMessage {
            role: match turn.role {
                Role::Assistant => "assistant",
                _ => "user",
            },
            content: &turn.content,
        })
        .collect();

    MessagesBody {
        model: &request.model,
        max_tokens: request.max_tokens,
        messages,
        system,
        temperature: request.temperature,
    }
}

/// The Anthropic Messages endpoint.
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    http: Client,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn complete_once(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let body = build_body(request);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 429 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::RateLimited {
                provider: Provider::Anthropic,
                message,
            });
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::Api {
                provider: Provider::Anthropic,
                status,
                message,
            });
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: Provider::Anthropic,
                    message: format!("failed to parse response: {e}"),
                })?;

        parsed
            .text()
            .map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: Provider::Anthropic,
                message: "response contained no text block".into(),
            })
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<Vec<String>, LlmError> {
        let mut completions = Vec::with_capacity(request.n as usize);
        for _ in 0..request.n.max(1) {
            completions.push(self.complete_once(api_key, request).await?);
        }
        Ok(completions)
    }
}
