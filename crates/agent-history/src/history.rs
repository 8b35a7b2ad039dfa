//! Append-only step history and the `updateAgentHistory` algorithm
//! (spec §4.5).

use crate::model::{AgentOutput, HistoryItem};
use crate::render::{render_history, truncate_error};
use action_controller::Action;
use browser_session::ActionResult;

/// Per-action descriptor used in a step's `Action Results:` section.
///
/// Clicks and typing are described by element index rather than a CSS
/// selector: no selector is retained anywhere past `dom-serializer`'s
/// index assignment, so the index is the only stable handle left by the
/// time history is recorded.
fn descriptor_for(action: &Action, result: &ActionResult) -> String {
    let base = match action {
        Action::GoToUrl { url, .. } => format!("Navigated to {url}"),
        Action::ClickElementByIndex { index } => format!("Clicked element {index}"),
        Action::TypeText { index, text } => format!("Typed \"{text}\" into element {index}"),
        Action::Scroll { .. } => result.message.clone(),
        Action::Wait { seconds } => format!("Waited {seconds} seconds"),
        Action::ExtractStructuredData { .. } => result.message.clone(),
        Action::Done { .. } => result.message.clone(),
        Action::CreateNewTab { url } => format!("Opened new tab at {url}"),
        Action::SwitchToTab { index } => format!("Switched to tab {index}"),
        Action::GoBack => "Navigated back".to_string(),
        Action::GoForward => "Navigated forward".to_string(),
        Action::Refresh => "Refreshed the page".to_string(),
    };
    match &result.error {
        Some(err) => format!("{base} (error: {})", truncate_error(err)),
        None => base,
    }
}

/// Append-only history of an agent run, rendered for prompt assembly.
#[derive(Clone, Debug, Default)]
pub struct AgentHistory {
    pub items: Vec<HistoryItem>,
    pub read_state_description: Option<String>,
}

impl AgentHistory {
    /// Seeds the history with the mandatory first "Agent initialized"
    /// system item (spec §3).
    pub fn new() -> Self {
        Self {
            items: vec![HistoryItem::system(0, "Agent initialized".to_string())],
            read_state_description: None,
        }
    }

    /// Records one completed step: either a model-output step item, or
    /// (when the model produced no output past step 0) an error item.
    pub fn update(
        &mut self,
        step_number: u32,
        model_output: Option<&AgentOutput>,
        results: &[ActionResult],
        actions: &[Action],
    ) {
        self.read_state_description = None;

        let mut action_result_lines = Vec::with_capacity(results.len());
        let mut read_state_sections = Vec::new();
        let total = results.len();
        for (i, (result, action)) in results.iter().zip(actions.iter()).enumerate() {
            action_result_lines.push(format!(
                "Action {}/{}: {}",
                i + 1,
                total,
                descriptor_for(action, result)
            ));
            if result.include_extracted_content_only_once {
                if let Some(content) = &result.extracted_content {
                    read_state_sections.push(format!(
                        "<read_state_{i}>\n{content}\n</read_state_{i}>",
                        i = i + 1
                    ));
                }
            }
        }
        if !read_state_sections.is_empty() {
            self.read_state_description = Some(read_state_sections.join("\n"));
        }

        match model_output {
            Some(output) => {
                self.items.push(HistoryItem::step(
                    step_number,
                    output.evaluation_previous_goal.clone(),
                    output.memory.clone(),
                    output.next_goal.clone(),
                    action_result_lines,
                ));
            }
            None if step_number > 0 => {
                let message = results
                    .iter()
                    .find_map(|r| r.error.clone())
                    .unwrap_or_else(|| "model produced no output".to_string());
                self.items
                    .push(HistoryItem::error(step_number, truncate_error(&message)));
            }
            None => {}
        }
    }

    pub fn render_all(&self) -> String {
        render_history(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_agent_initialized_system_item() {
        let history = AgentHistory::new();
        assert_eq!(history.items.len(), 1);
        assert!(history.items[0].is_system());
        assert_eq!(
            history.items[0].system_message.as_deref(),
            Some("Agent initialized")
        );
    }

    #[test]
    fn update_with_no_output_past_step_zero_records_error_item() {
        let mut history = AgentHistory::new();
        history.update(1, None, &[], &[]);
        assert_eq!(history.items.len(), 2);
        assert!(history.items[1].is_error());
    }

    #[test]
    fn update_records_action_result_lines_and_read_state() {
        let mut history = AgentHistory::new();
        let output = AgentOutput {
            thinking: None,
            evaluation_previous_goal: Some("loaded fine".to_string()),
            memory: Some("looking for price".to_string()),
            next_goal: Some("click buy button".to_string()),
            action: vec![],
        };
        let action = Action::ClickElementByIndex { index: 3 };
        let result = ActionResult {
            success: true,
            message: "clicked".to_string(),
            error: None,
            extracted_content: Some("price: $9".to_string()),
            include_extracted_content_only_once: true,
            long_term_memory: None,
        };
        history.update(1, Some(&output), &[result], &[action]);
        let last = history.items.last().unwrap();
        assert_eq!(last.action_results.len(), 1);
        assert!(last.action_results[0].contains("Clicked element 3"));
        assert!(history
            .read_state_description
            .as_ref()
            .unwrap()
            .contains("price: $9"));
    }
}
