use thiserror::Error;

/// Failure returned by a model provider (spec §7 "ModelProviderError").
#[derive(Debug, Error)]
#[error("model provider error (status {status:?}): {message}")]
pub struct ModelProviderError {
    /// HTTP-style status code when the provider is HTTP-backed; `None` for
    /// transports without one (e.g. a local test double).
    pub status: Option<u16>,
    pub message: String,
}

impl ModelProviderError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Whether `agent-loop`'s retry policy should swap to the fallback
    /// model for this error (spec §4.7 "LLM retry/fallback": 429 or 5xx).
    pub fn is_retryable(&self) -> bool {
        matches!(self.status, Some(429) | Some(500..=599))
    }
}

/// Rate-limit-specific provider failure (spec §7 "ModelRateLimitError").
/// Always retryable via the single fallback swap.
#[derive(Debug, Error)]
#[error("model rate limited: {message}")]
pub struct ModelRateLimitError {
    pub message: String,
    pub retry_after: Option<std::time::Duration>,
}

/// The model's completion did not conform to `StructuredAgentOutput`
/// (spec §7 "ParseError").
#[derive(Debug, Error)]
#[error("failed to parse model output as structured agent output: {0}")]
pub struct ParseError(pub String);

/// Top-level error surfaced by `LlmClient::invoke`.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error(transparent)]
    Provider(#[from] ModelProviderError),
    #[error(transparent)]
    RateLimit(#[from] ModelRateLimitError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("operation was cancelled")]
    Aborted,
}

impl LlmError {
    /// Whether `agent-loop` should switch to the configured fallback model
    /// before the next `invoke` (spec §4.7).
    pub fn triggers_fallback_swap(&self) -> bool {
        match self {
            LlmError::Provider(e) => e.is_retryable(),
            LlmError::RateLimit(_) => true,
            LlmError::Parse(_) | LlmError::Aborted => false,
        }
    }
}
