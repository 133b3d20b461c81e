//! Canonical conversation and request types, independent of any wire format.

use serde::{Deserialize, Serialize};

/// Role of a turn in a canonical conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    /// Pure alias of `System`; some OpenAI-compatible clients emit it.
    Developer,
    User,
    Assistant,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::Developer => "developer",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// True for turns carrying system instructions (`system` and its
    /// `developer` alias).
    pub const fn is_system(&self) -> bool {
        matches!(self, Role::System | Role::Developer)
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// An ordered sequence of turns.
pub type Conversation = Vec<Turn>;

/// One canonical completion request.
///
/// `model` is a raw model name; routing resolves it to a provider and
/// canonical id at dispatch time.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub conversation: Conversation,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Number of completions to generate (>= 1).
    pub n: u32,
    /// Reasoning budget override for providers that support one.
    /// `None` leaves the provider default in place, except where a model
    /// variant suppresses reasoning by default.
    pub thinking_budget: Option<u32>,
}

impl CompletionRequest {
    pub fn new(conversation: Conversation, model: impl Into<String>) -> Self {
        Self {
            conversation,
            model: model.into(),
            max_tokens: 512,
            temperature: 0.5,
            n: 1,
            thinking_budget: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_n(mut self, n: u32) -> Self {
        self.n = n.max(1);
        self
    }

    pub fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(
            serde_json::to_string(&Role::Developer).unwrap(),
            "\"developer\""
        );
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn developer_is_a_system_alias() {
        assert!(Role::System.is_system());
        assert!(Role::Developer.is_system());
        assert!(!Role::User.is_system());
        assert!(!Role::Assistant.is_system());
    }

    #[test]
    fn turn_roundtrip() {
        let turn = Turn::user("What is 2+2?");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::User);
        assert_eq!(back.content, "What is 2+2?");
    }

    #[test]
    fn request_builder_defaults() {
        let req = CompletionRequest::new(vec![Turn::user("hi")], "gpt-4o");
        assert_eq!(req.max_tokens, 512);
        assert_eq!(req.n, 1);
        assert!(req.thinking_budget.is_none());

        let req = req.with_max_tokens(8192).with_temperature(0.7).with_n(3);
        assert_eq!(req.max_tokens, 8192);
        assert_eq!(req.n, 3);
    }

    #[test]
    fn n_is_clamped_to_at_least_one() {
        let req = CompletionRequest::new(vec![], "gpt-4o").with_n(0);
        assert_eq!(req.n, 1);
    }
}
