//! Messages and completion envelope for the `invoke` contract (spec §6).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call options threaded into `invoke` (timeouts, sampling are a
/// provider concern and intentionally not modeled here).
#[derive(Clone, Debug, Default)]
pub struct InvokeOptions {
    pub model: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// `{ completion: StructuredAgentOutput, usage? }` (spec §6). Reuses
/// `agent_history::AgentOutput` as `StructuredAgentOutput`: both name the
/// same four optional `current_state` fields plus the action list, just
/// without an intermediate nested struct.
#[derive(Clone, Debug)]
pub struct CompletionResponse {
    pub completion: agent_history::AgentOutput,
    pub usage: Option<Usage>,
}
