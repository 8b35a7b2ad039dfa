//! `invoke(messages, opts) -> StructuredAgentOutput` provider contract
//! (spec §6). No vendor HTTP integration — out of scope by design.

pub mod client;
pub mod errors;
pub mod model;
pub mod testing;

pub use client::LlmClient;
pub use errors::{LlmError, ModelProviderError, ModelRateLimitError, ParseError};
pub use model::{ChatMessage, CompletionResponse, InvokeOptions, Role, Usage};
