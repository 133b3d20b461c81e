//! Process-wide credential resolution — one secret per provider, prompt-once.
//!
//! Resolution order: cached slot, then the provider's environment variable,
//! then an interactive terminal prompt. The slot mutex is held across the
//! whole check-and-prompt, so concurrent first use by many dispatcher
//! workers serializes and the prompt never appears twice.

use std::io::{self, Write};

use tokio::sync::Mutex;
use tracing::debug;

use super::router::Provider;
use super::LlmError;

/// One secret per provider, populated at most once per process.
#[derive(Debug, Default)]
pub struct CredentialStore {
    openai: Mutex<Option<String>>,
    together: Mutex<Option<String>>,
    google: Mutex<Option<String>>,
    anthropic: Mutex<Option<String>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, provider: Provider) -> &Mutex<Option<String>> {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::Together => &self.together,
            Provider::Google => &self.google,
            Provider::Anthropic => &self.anthropic,
        }
    }

    /// Seed a credential directly, bypassing environment and prompt.
    pub async fn put(&self, provider: Provider, secret: impl Into<String>) {
        *self.slot(provider).lock().await = Some(secret.into());
    }

    /// Resolve the secret for `provider`, prompting interactively at most
    /// once per process lifetime.
    pub async fn resolve(&self, provider: Provider) -> Result<String, LlmError> {
        let mut slot = self.slot(provider).lock().await;

        if let Some(secret) = slot.as_ref() {
            return Ok(secret.clone());
        }

        if let Ok(secret) = std::env::var(provider.env_var()) {
            if !secret.trim().is_empty() {
                debug!(%provider, "credential resolved from environment");
                *slot = Some(secret.clone());
                return Ok(secret);
            }
        }

        let secret = prompt_secret(provider).await?;
        *slot = Some(secret.clone());
        Ok(secret)
    }
}

/// Read a secret from the terminal on a blocking worker thread.
async fn prompt_secret(provider: Provider) -> Result<String, LlmError> {
    let secret = tokio::task::spawn_blocking(move || -> io::Result<String> {
        eprint!("Enter your {} API key ({}): ", provider, provider.env_var());
        io::stderr().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
    .await
    .map_err(|e| LlmError::Credential(io::Error::other(e)))?
    .map_err(LlmError::Credential)?;

    if secret.is_empty() {
        return Err(LlmError::Credential(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("empty {provider} API key"),
        )));
    }
    Ok(secret)
}
