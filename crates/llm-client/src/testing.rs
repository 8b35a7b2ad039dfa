//! Deterministic `LlmClient` test doubles, used by `agent-loop`'s own
//! tests to exercise retry/fallback without a real provider.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::client::LlmClient;
use crate::errors::{LlmError, ModelProviderError};
use crate::model::{ChatMessage, CompletionResponse, InvokeOptions, Usage};

/// Always returns the same completion.
pub struct FixedResponseClient {
    name: String,
    response: agent_history::AgentOutput,
}

impl FixedResponseClient {
    pub fn new(name: impl Into<String>, response: agent_history::AgentOutput) -> Self {
        Self {
            name: name.into(),
            response,
        }
    }
}

#[async_trait]
impl LlmClient for FixedResponseClient {
    async fn invoke(
        &self,
        _messages: &[ChatMessage],
        _opts: &InvokeOptions,
    ) -> Result<CompletionResponse, LlmError> {
        Ok(CompletionResponse {
            completion: self.response.clone(),
            usage: Some(Usage::default()),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Fails a fixed number of times with a given status, then delegates to an
/// inner client. Used to exercise the single fallback-swap path.
pub struct FlakyClient<T> {
    name: String,
    failures_remaining: AtomicUsize,
    status: u16,
    inner: T,
}

impl<T: LlmClient> FlakyClient<T> {
    pub fn new(name: impl Into<String>, failures: usize, status: u16, inner: T) -> Self {
        Self {
            name: name.into(),
            failures_remaining: AtomicUsize::new(failures),
            status,
            inner,
        }
    }
}

#[async_trait]
impl<T: LlmClient> LlmClient for FlakyClient<T> {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        opts: &InvokeOptions,
    ) -> Result<CompletionResponse, LlmError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            return Err(LlmError::Provider(ModelProviderError::new(
                Some(self.status),
                "synthetic failure",
            )));
        }
        self.inner.invoke(messages, opts).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> agent_history::AgentOutput {
        agent_history::AgentOutput {
            thinking: None,
            evaluation_previous_goal: Some("ok".to_string()),
            memory: None,
            next_goal: Some("continue".to_string()),
            action: vec![],
        }
    }

    #[tokio::test]
    async fn flaky_client_fails_then_delegates() {
        let inner = FixedResponseClient::new("primary", output());
        let flaky = FlakyClient::new("flaky", 1, 503, inner);
        let err = flaky.invoke(&[], &InvokeOptions::default()).await.unwrap_err();
        assert!(err.triggers_fallback_swap());
        let ok = flaky.invoke(&[], &InvokeOptions::default()).await;
        assert!(ok.is_ok());
    }
}
