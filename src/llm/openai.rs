//! OpenAI-compatible chat-completion backend.
//!
//! Bearer-token REST against `{base}/chat/completions` with a hand-built
//! JSON body. Serves two catalogs (OpenAI and Together) that share the wire
//! protocol and differ only in base URL and credential.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::router::Provider;
use super::types::{CompletionRequest, Role, Turn};
use super::{ChatBackend, LlmError};

/// Request body for `POST {base}/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    n: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// The wire speaks `system`; the `developer` alias folds into it.
fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System | Role::Developer => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn build_body<'a>(request: &'a CompletionRequest) -> ChatCompletionBody<'a> {
    ChatCompletionBody {
        model: &request.model,
        messages: request
            .conversation
            .iter()
            .map(|turn: &Turn| WireMessage {
                role: wire_role(turn.role),
                content: &turn.content,
            })
            .collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        n: request.n,
    }
}

/// One OpenAI-compatible catalog endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: Client,
    provider: Provider,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(http: Client, provider: Provider, base_url: impl Into<String>) -> Self {
        Self {
            http,
            provider,
            base_url: base_url.into(),
        }
    }

    fn parse(&self, response: ChatCompletionResponse) -> Result<Vec<String>, LlmError> {
        if response.choices.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.provider,
                message: "response contained no choices".into(),
            });
        }
        let mut completions = Vec::with_capacity(response.choices.len());
        for choice in response.choices {
            completions.push(choice.message.content.ok_or_else(|| {
                LlmError::InvalidResponse {
                    provider: self.provider,
                    message: "choice had no message content".into(),
                }
            })?);
        }
        Ok(completions)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = build_body(request);

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 429 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::RateLimited {
                provider: self.provider,
                message,
            });
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::Api {
                provider: self.provider,
                status,
                message,
            });
        }

        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: self.provider,
                    message: format!("failed to parse response: {e}"),
                })?;
        self.parse(parsed)
    }
}
