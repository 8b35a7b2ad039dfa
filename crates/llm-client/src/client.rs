//! The `invoke` contract consumed by `agent-loop` (spec §6).

use async_trait::async_trait;

use crate::errors::LlmError;
use crate::model::{ChatMessage, CompletionResponse, InvokeOptions};

/// Minimal capability surface an LLM provider must expose. No vendor HTTP
/// integration lives in this crate — only the contract and, in `tests`,
/// deterministic doubles for exercising `agent-loop`'s retry/fallback path.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        opts: &InvokeOptions,
    ) -> Result<CompletionResponse, LlmError>;

    /// A short identifier used in logs and fallback-swap tracing.
    fn name(&self) -> &str;
}
