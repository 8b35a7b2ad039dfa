//! Inputs to prompt assembly (spec §4.6).

use serde::{Deserialize, Serialize};

/// Per-step bookkeeping rendered into `<step_info>`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepInfo {
    pub step_number: u32,
    pub max_steps: u32,
}

/// Agent task state rendered into `<agent_state>`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub user_request: String,
    pub file_system: Option<String>,
    pub todo_contents: Option<String>,
}

/// All inputs `PromptAssembler::build` needs for one step.
pub struct PromptInputs<'a> {
    pub history_rendered: &'a str,
    pub agent_state: &'a AgentState,
    pub step_info: &'a StepInfo,
    pub browser_state: &'a browser_session::BrowserStateSummary,
    pub read_state: Option<&'a str>,
    pub page_specific_actions: Option<&'a str>,
}
