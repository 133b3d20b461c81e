//! Bounded-concurrency fan-out with ordered, isolated results.
//!
//! N conversations go in, N (input, result-or-error-string) pairs come out
//! in input order, no matter what order the completions finish in. A single
//! item exhausting its retries never aborts or delays its siblings.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::retry::{call_with_retry, RetryPolicy};
use super::router::resolve_model;
use super::types::{CompletionRequest, Conversation};
use super::{LlmClient, LlmError};

/// One dispatched conversation paired with its outcome. Failed items carry
/// the final error's string form instead of propagating it.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub conversation: Conversation,
    pub result: Result<Vec<String>, String>,
}

impl BatchItem {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fan `conversations` out over up to `limit` concurrent calls.
///
/// Each item runs `call` under `policy`, retrying only failures the error's
/// own classification marks retryable. The output always has one entry per
/// input, in input order.
pub async fn dispatch<F, Fut>(
    conversations: Vec<Conversation>,
    limit: usize,
    policy: RetryPolicy,
    call: F,
) -> Vec<BatchItem>
where
    F: Fn(Conversation) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, LlmError>> + Send + 'static,
{
    let total = conversations.len();
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut workers = JoinSet::new();

    // Placeholders keep the one-entry-per-input invariant even if a worker
    // dies without reporting.
    let mut items: Vec<BatchItem> = conversations
        .iter()
        .map(|conversation| BatchItem {
            conversation: conversation.clone(),
            result: Err("dispatch worker failed before completing".to_string()),
        })
        .collect();

    for (index, conversation) in conversations.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let call = call.clone();
        let policy = policy.clone();
        workers.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let result = call_with_retry(&policy, LlmError::is_retryable, || {
                call(conversation.clone())
            })
            .await
            .map_err(|err| err.to_string());
            (index, result)
        });
    }

    let mut done = 0usize;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((index, result)) => {
                if let Err(message) = &result {
                    warn!(index, "batch item failed: {message}");
                }
                items[index].result = result;
                done += 1;
                info!(done, total, "batch progress");
            }
            Err(err) => warn!("batch worker panicked: {err}"),
        }
    }

    items
}

impl LlmClient {
    /// Dispatch one request template across many conversations.
    ///
    /// The template's credential is resolved up front so an interactive
    /// prompt happens once, before any worker starts.
    pub async fn complete_batch(
        &self,
        conversations: Vec<Conversation>,
        template: &CompletionRequest,
        limit: usize,
    ) -> Result<Vec<BatchItem>, LlmError> {
        let resolved = resolve_model(&template.model)
            .ok_or_else(|| LlmError::UnknownModel(template.model.clone()))?;
        self.credentials().resolve(resolved.provider).await?;

        let client = self.clone();
        let template = template.clone();
        let items = dispatch(
            conversations,
            limit,
            RetryPolicy::default(),
            move |conversation| {
                let client = client.clone();
                let mut request = template.clone();
                async move {
                    request.conversation = conversation;
                    client.complete(&request).await
                }
            },
        )
        .await;
        Ok(items)
    }
}
