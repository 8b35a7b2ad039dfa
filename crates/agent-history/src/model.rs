//! History item representation (spec §3 "HistoryItem", §4.5).
//!
//! Kept as one struct with optional `error`/`system_message` fields rather
//! than a three-way enum, matching the spec's own phrasing of the
//! invariant ("a single item never carries both an error and a system
//! message") as a constraint on a shared shape rather than a type-level
//! split.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("a history item cannot carry both an error and a system message")]
    ConflictingErrorAndSystemMessage,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryItem {
    pub step_number: u32,
    pub evaluation_previous_goal: Option<String>,
    pub memory: Option<String>,
    pub next_goal: Option<String>,
    pub action_results: Vec<String>,
    pub error: Option<String>,
    pub system_message: Option<String>,
}

impl HistoryItem {
    pub fn new(
        step_number: u32,
        evaluation_previous_goal: Option<String>,
        memory: Option<String>,
        next_goal: Option<String>,
        action_results: Vec<String>,
        error: Option<String>,
        system_message: Option<String>,
    ) -> Result<Self, HistoryError> {
        if error.is_some() && system_message.is_some() {
            return Err(HistoryError::ConflictingErrorAndSystemMessage);
        }
        Ok(Self {
            step_number,
            evaluation_previous_goal,
            memory,
            next_goal,
            action_results,
            error,
            system_message,
        })
    }

    pub fn step(
        step_number: u32,
        evaluation_previous_goal: Option<String>,
        memory: Option<String>,
        next_goal: Option<String>,
        action_results: Vec<String>,
    ) -> Self {
        Self {
            step_number,
            evaluation_previous_goal,
            memory,
            next_goal,
            action_results,
            error: None,
            system_message: None,
        }
    }

    pub fn error(step_number: u32, message: String) -> Self {
        Self {
            step_number,
            error: Some(message),
            ..Default::default()
        }
    }

    pub fn system(step_number: u32, message: String) -> Self {
        Self {
            step_number,
            system_message: Some(message),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_system(&self) -> bool {
        self.system_message.is_some()
    }
}

/// The model's structured per-step output (spec §6 "LLM interface
/// (consumed)"): `current_state` fields plus the action list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentOutput {
    pub thinking: Option<String>,
    pub evaluation_previous_goal: Option<String>,
    pub memory: Option<String>,
    pub next_goal: Option<String>,
    pub action: Vec<action_controller::Action>,
}
