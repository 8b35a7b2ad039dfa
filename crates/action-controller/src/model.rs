//! Tagged-union action representation (spec §4.4, §9 "Polymorphic actions").
//!
//! Serializes externally-tagged (`{"go_to_url": {...}}`), one key populated
//! at a time, matching the single-action-variant shape an LLM structured
//! output schema would emit.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    GoToUrl {
        url: String,
        #[serde(default)]
        new_tab: bool,
    },
    ClickElementByIndex {
        index: u32,
    },
    TypeText {
        index: u32,
        text: String,
    },
    Scroll {
        #[serde(default)]
        pixels: i64,
    },
    Wait {
        seconds: u64,
    },
    ExtractStructuredData {
        query: String,
        #[serde(default)]
        links: bool,
    },
    Done {
        text: String,
        success: bool,
        #[serde(default)]
        files: Vec<String>,
    },
    CreateNewTab {
        url: String,
    },
    SwitchToTab {
        index: i64,
    },
    GoBack,
    GoForward,
    Refresh,
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::GoToUrl { .. } => "go_to_url",
            Action::ClickElementByIndex { .. } => "click_element_by_index",
            Action::TypeText { .. } => "type_text",
            Action::Scroll { .. } => "scroll",
            Action::Wait { .. } => "wait",
            Action::ExtractStructuredData { .. } => "extract_structured_data",
            Action::Done { .. } => "done",
            Action::CreateNewTab { .. } => "create_new_tab",
            Action::SwitchToTab { .. } => "switch_to_tab",
            Action::GoBack => "go_back",
            Action::GoForward => "go_forward",
            Action::Refresh => "refresh",
        }
    }

    /// Terminating actions end the current `multi_act` sequence early
    /// (spec §4.4) because they change page or agent state.
    pub fn is_terminating(&self) -> bool {
        matches!(
            self,
            Action::GoToUrl { .. }
                | Action::CreateNewTab { .. }
                | Action::SwitchToTab { .. }
                | Action::GoBack
                | Action::GoForward
                | Action::Refresh
                | Action::Done { .. }
        )
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Action::Done { .. })
    }

    /// The selector-map index this action targets, if any — used for both
    /// execution and replay re-resolution (spec §4.7).
    pub fn element_index(&self) -> Option<u32> {
        match self {
            Action::ClickElementByIndex { index } => Some(*index),
            Action::TypeText { index, .. } => Some(*index),
            _ => None,
        }
    }
}
