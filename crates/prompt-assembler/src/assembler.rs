//! Fixed-order XML-tagged prompt assembly (spec §4.6).

use crate::browser_state::render_browser_state;
use crate::model::PromptInputs;
use action_controller::render_page_actions;

#[derive(Default)]
pub struct PromptAssembler;

impl PromptAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, inputs: &PromptInputs<'_>) -> String {
        let mut sections = Vec::new();

        sections.push(format!(
            "<agent_history>\n{}\n</agent_history>",
            inputs.history_rendered
        ));

        let mut agent_state = String::new();
        agent_state.push_str(&format!(
            "<user_request>\n{}\n</user_request>\n",
            inputs.agent_state.user_request
        ));
        if let Some(fs) = &inputs.agent_state.file_system {
            agent_state.push_str(&format!("<file_system>\n{fs}\n</file_system>\n"));
        }
        if let Some(todo) = &inputs.agent_state.todo_contents {
            agent_state.push_str(&format!("<todo_contents>\n{todo}\n</todo_contents>\n"));
        }
        agent_state.push_str(&format!(
            "<step_info>\nStep {} of {}\n</step_info>",
            inputs.step_info.step_number + 1,
            inputs.step_info.max_steps
        ));
        sections.push(format!("<agent_state>\n{agent_state}\n</agent_state>"));

        sections.push(format!(
            "<browser_state>\n{}\n</browser_state>",
            render_browser_state(inputs.browser_state)
        ));

        if let Some(read_state) = inputs.read_state {
            sections.push(format!("<read_state>\n{read_state}\n</read_state>"));
        }

        sections.push(format!(
            "<page_actions>\n{}\n</page_actions>",
            render_page_actions()
        ));

        if let Some(extra) = inputs.page_specific_actions {
            sections.push(format!(
                "<page_specific_actions>\n{extra}\n</page_specific_actions>"
            ));
        }

        sections.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentState, StepInfo};
    use browser_session::{PageInfo, Tab};
    use dom_serializer::SelectorMap;

    fn state() -> browser_session::BrowserStateSummary {
        browser_session::BrowserStateSummary {
            url: "https://example.com".to_string(),
            title: "Example".to_string(),
            tabs: vec![Tab {
                page_id: 1,
                url: "https://example.com".to_string(),
                title: "Example".to_string(),
                parent_page_id: None,
            }],
            selector_map: SelectorMap::default(),
            dom_string: Some("[1] <button>Go</button>".to_string()),
            screenshot: None,
            page_info: PageInfo {
                viewport_width: 1280,
                viewport_height: 720,
                page_width: 1280,
                page_height: 720,
                scroll_x: 0,
                scroll_y: 0,
            },
            pixels_above: 0,
            pixels_below: 0,
            pixels_left: 0,
            pixels_right: 0,
            is_pdf_viewer: false,
            loading_status: None,
            browser_errors: Vec::new(),
            pending_network_requests: Vec::new(),
            closed_popup_messages: Vec::new(),
            recent_events: None,
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let browser_state = state();
        let agent_state = AgentState {
            user_request: "find the price".to_string(),
            file_system: None,
            todo_contents: None,
        };
        let step_info = StepInfo {
            step_number: 0,
            max_steps: 50,
        };
        let inputs = PromptInputs {
            history_rendered: "<step_0>\nSystem: Agent initialized\n</step_0>",
            agent_state: &agent_state,
            step_info: &step_info,
            browser_state: &browser_state,
            read_state: None,
            page_specific_actions: None,
        };
        let prompt = PromptAssembler::new().build(&inputs);
        let history_pos = prompt.find("<agent_history>").unwrap();
        let state_pos = prompt.find("<agent_state>").unwrap();
        let browser_pos = prompt.find("<browser_state>").unwrap();
        let actions_pos = prompt.find("<page_actions>").unwrap();
        assert!(history_pos < state_pos);
        assert!(state_pos < browser_pos);
        assert!(browser_pos < actions_pos);
        assert!(!prompt.contains("<read_state>"));
    }

    #[test]
    fn read_state_included_only_when_present() {
        let browser_state = state();
        let agent_state = AgentState::default();
        let step_info = StepInfo {
            step_number: 2,
            max_steps: 50,
        };
        let inputs = PromptInputs {
            history_rendered: "",
            agent_state: &agent_state,
            step_info: &step_info,
            browser_state: &browser_state,
            read_state: Some("<read_state_1>\nextracted\n</read_state_1>"),
            page_specific_actions: None,
        };
        let prompt = PromptAssembler::new().build(&inputs);
        assert!(prompt.contains("<read_state>"));
        assert!(prompt.contains("extracted"));
    }
}
