//! Multi-provider chat-completion layer.
//!
//! Normalizes three wire protocols behind one canonical request shape:
//! OpenAI-compatible REST (two catalogs on different base URLs), the Gemini
//! REST API, and the Anthropic Messages API. All calls are raw HTTP via
//! reqwest — no vendor SDKs.

pub mod anthropic;
pub mod batch;
pub mod credentials;
pub mod google;
pub mod openai;
pub mod retry;
pub mod router;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use anthropic::AnthropicBackend;
use credentials::CredentialStore;
use google::GoogleBackend;
use openai::OpenAiBackend;
use router::resolve_model;

pub use batch::{dispatch, BatchItem};
pub use retry::{call_with_retry, RetryPolicy};
pub use router::{Provider, ResolvedModel};
pub use types::{CompletionRequest, Conversation, Role, Turn};

/// Errors from the completion layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Network-level failure before or during the HTTP exchange.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx status from a provider, other than a rate limit.
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    /// HTTP 429 from a provider.
    #[error("{provider} rate limited (status 429): {message}")]
    RateLimited { provider: Provider, message: String },

    /// A 2xx response whose body did not parse into the expected shape.
    #[error("invalid {provider} response: {message}")]
    InvalidResponse { provider: Provider, message: String },

    /// The raw model name matched no catalog.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    /// The interactive credential prompt failed.
    #[error("credential prompt failed: {0}")]
    Credential(std::io::Error),
}

impl LlmError {
    /// Transport failures and rate limits are worth retrying; everything
    /// else (bad request, invalid model, auth) is a hard failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transport(_) | LlmError::RateLimited { .. })
    }
}

/// One wire protocol, invoked with an already-resolved canonical model id.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn provider(&self) -> Provider;

    /// Issue one request and return its 1..n completions in the provider's
    /// candidate order.
    async fn complete(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<Vec<String>, LlmError>;
}

/// Base URLs per backend, overridable for tests against mock servers.
#[derive(Debug, Clone)]
pub struct BaseUrls {
    pub openai: String,
    pub together: String,
    pub google: String,
    pub anthropic: String,
}

impl Default for BaseUrls {
    fn default() -> Self {
        Self {
            openai: "https://api.openai.com/v1".into(),
            together: "https://api.together.xyz/v1".into(),
            google: "https://generativelanguage.googleapis.com/v1beta".into(),
            anthropic: "https://api.anthropic.com".into(),
        }
    }
}

/// Routed completion client.
///
/// Resolves the model name, the credential, and the wire protocol for each
/// request, then delegates to the matching backend. Cloning is cheap: the
/// HTTP client and credential store are shared.
#[derive(Clone)]
pub struct LlmClient {
    credentials: Arc<CredentialStore>,
    openai: OpenAiBackend,
    together: OpenAiBackend,
    google: GoogleBackend,
    anthropic: AnthropicBackend,
}

impl LlmClient {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self::with_base_urls(credentials, BaseUrls::default())
    }

    pub fn with_base_urls(credentials: Arc<CredentialStore>, urls: BaseUrls) -> Self {
        let http = reqwest::Client::new();
        Self {
            openai: OpenAiBackend::new(http.clone(), Provider::OpenAi, urls.openai),
            together: OpenAiBackend::new(http.clone(), Provider::Together, urls.together),
            google: GoogleBackend::new(http.clone(), urls.google),
            anthropic: AnthropicBackend::new(http, urls.anthropic),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    fn backend(&self, provider: Provider) -> &dyn ChatBackend {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Together => &self.together,
            Provider::Google => &self.google,
            Provider::Anthropic => &self.anthropic,
        }
    }

    /// Issue one canonical request, returning its n completions.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<Vec<String>, LlmError> {
        let resolved = resolve_model(&request.model)
            .ok_or_else(|| LlmError::UnknownModel(request.model.clone()))?;
        let api_key = self.credentials.resolve(resolved.provider).await?;

        let mut wire = request.clone();
        wire.model = resolved.model;

        debug!(provider = %resolved.provider, model = %wire.model, n = wire.n, "dispatching completion");
        self.backend(resolved.provider).complete(&api_key, &wire).await
    }

    /// Convenience for n=1 calls: one request, one string.
    pub async fn complete_one(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut single = request.clone();
        single.n = 1;
        let resolved = resolve_model(&single.model)
            .ok_or_else(|| LlmError::UnknownModel(single.model.clone()))?;
        let completions = self.complete(&single).await?;
        completions
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse {
                provider: resolved.provider,
                message: "no completion returned".into(),
            })
    }
}
