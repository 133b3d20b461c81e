//! Gemini REST backend.
//!
//! A leading system turn lifts into `systemInstruction`; remaining turns map
//! user→user, assistant→model with content wrapped as parts. Provider-side
//! content filters are explicitly disabled across every harm category, and a
//! thinking-budget override is supported (suppressed by default on the
//! latency-sensitive flash preview).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::router::Provider;
use super::types::{CompletionRequest, Role};
use super::{ChatBackend, LlmError};

/// Model variant whose reasoning is suppressed unless a budget is set.
const SUPPRESSED_THINKING_MODEL: &str = "gemini-2.5-flash-preview-04-17";

const HARM_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_CIVIC_INTEGRITY",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn build_body(request: &CompletionRequest) -> GenerateContentBody {
    let mut turns = request.conversation.as_slice();
    let mut system_instruction = None;

    if let Some(first) = turns.first() {
        if first.role.is_system() {
            system_instruction = Some(Content {
                role: None,
                parts: vec![Part {
                    text: first.content.clone(),
                }],
            });
            turns = &turns[1..];
        }
    }

    let contents = turns
        .iter()
        .filter(|turn| !turn.role.is_system())
        .map(|turn| Content {
            role: Some(
                match turn.role {
                    Role::Assistant => "model",
                    _ => "user",
                }
                .to_string(),
            ),
            parts: vec![Part {
                text: turn.content.clone(),
            }],
        })
        .collect();

    let thinking_budget = request.thinking_budget.or_else(|| {
        (request.model == SUPPRESSED_THINKING_MODEL).then_some(0)
    });

    GenerateContentBody {
        contents,
        system_instruction,
        safety_settings: HARM_CATEGORIES
            .iter()
            .copied()
            .map(|category| SafetySetting {
                category,
                threshold: "BLOCK_NONE",
            })
            .collect(),
        generation_config: GenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            candidate_count: (request.n > 1).then_some(request.n),
            thinking_config: thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
        },
    }
}

/// The Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GoogleBackend {
    http: Client,
    base_url: String,
}

impl GoogleBackend {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn parse(&self, response: GenerateContentResponse) -> Result<Vec<String>, LlmError> {
        let candidates = response.candidates.unwrap_or_default();
        let mut completions = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let text = candidate
                .content
                .map(|content| {
                    content
                        .parts
                        .into_iter()
                        .map(|part| part.text)
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();
            if !text.is_empty() {
                completions.push(text);
            }
        }
        if completions.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: Provider::Google,
                message: "response contained no candidate text".into(),
            });
        }
        Ok(completions)
    }
}

#[async_trait]
impl ChatBackend for GoogleBackend {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<Vec<String>, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            request.model
        );
        let body = build_body(request);

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 429 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::RateLimited {
                provider: Provider::Google,
                message,
            });
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(LlmError::Api {
                provider: Provider::Google,
                status,
                message,
            });
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    provider: Provider::Google,
                    message: format!("failed to parse response: {e}"),
                })?;
        self.parse(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Turn;

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            vec![
                Turn::system("Be brief."),
                Turn::user("hello"),
                Turn::assistant("hi"),
                Turn::user("what is 2+2?"),
            ],
            "gemini-2.0-flash",
        )
    }

    #[test]
    fn leading_system_turn_lifts_into_system_instruction() {
        let body = build_body(&request());
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json["systemInstruction"]["parts"][0]["text"],
            "Be brief."
        );
        // The lifted turn is gone from contents.
        assert_eq!(json["contents"].as_array().unwrap().len(), 3);
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][2]["parts"][0]["text"], "what is 2+2?");
    }

    #[test]
    fn no_system_turn_means_no_system_instruction() {
        let req = CompletionRequest::new(vec![Turn::user("hi")], "gemini-2.0-flash");
        let json = serde_json::to_value(build_body(&req)).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn every_harm_category_is_unblocked() {
        let json = serde_json::to_value(build_body(&request())).unwrap();
        let settings = json["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 5);
        for setting in settings {
            assert_eq!(setting["threshold"], "BLOCK_NONE");
        }
        let categories: Vec<&str> = settings
            .iter()
            .map(|s| s["category"].as_str().unwrap())
            .collect();
        assert!(categories.contains(&"HARM_CATEGORY_DANGEROUS_CONTENT"));
        assert!(categories.contains(&"HARM_CATEGORY_CIVIC_INTEGRITY"));
    }

    #[test]
    fn thinking_suppressed_by_default_on_flash_preview() {
        let mut req = request();
        req.model = SUPPRESSED_THINKING_MODEL.into();
        let json = serde_json::to_value(build_body(&req)).unwrap();
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            0
        );
    }

    #[test]
    fn explicit_thinking_budget_overrides_suppression() {
        let mut req = request().with_thinking_budget(2048);
        req.model = SUPPRESSED_THINKING_MODEL.into();
        let json = serde_json::to_value(build_body(&req)).unwrap();
        assert_eq!(
            json["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            2048
        );
    }

    #[test]
    fn other_models_carry_no_thinking_config() {
        let json = serde_json::to_value(build_body(&request())).unwrap();
        assert!(json["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn candidate_count_set_only_for_multi_candidate_requests() {
        let json = serde_json::to_value(build_body(&request())).unwrap();
        assert!(json["generationConfig"].get("candidateCount").is_none());

        let json = serde_json::to_value(build_body(&request().with_n(4))).unwrap();
        assert_eq!(json["generationConfig"]["candidateCount"], 4);
    }

    #[test]
    fn candidates_parse_in_provider_order() {
        let backend = GoogleBackend::new(Client::new(), "http://localhost:1");
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [
                {"content": {"role": "model", "parts": [{"text": "alpha"}]}},
                {"content": {"role": "model", "parts": [{"text": "beta"}, {"text": "-2"}]}}
            ]}"#,
        )
        .unwrap();
        let completions = backend.parse(response).unwrap();
        assert_eq!(completions, vec!["alpha", "beta-2"]);
    }

    #[test]
    fn missing_candidates_are_invalid() {
        let backend = GoogleBackend::new(Client::new(), "http://localhost:1");
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        let err = backend.parse(response).unwrap_err();
        assert!(matches!(
            err,
            LlmError::InvalidResponse {
                provider: Provider::Google,
                ..
            }
        ));
    }
}
