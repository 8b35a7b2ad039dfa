//! Dispatches named actions against a `BrowserSession` and sequences
//! multi-action steps with the terminating-action / URL-change stop guards
//! (spec §4.4).

use browser_session::{ActionResult, BrowserSession};
use dom_serializer::SelectorMap;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::ActionError;
use crate::model::Action;

#[derive(Default)]
pub struct ActionController;

impl ActionController {
    pub fn new() -> Self {
        Self
    }

    /// Executes a single action, resolving any selector-map index it
    /// targets against the capture the caller took this step.
    pub async fn execute(
        &self,
        session: &BrowserSession,
        selector_map: &SelectorMap,
        action: &Action,
    ) -> ActionResult {
        self.execute_on(session, selector_map, false, action).await
    }

    /// Like `execute`, but lets the caller say whether the page currently
    /// captured is a PDF viewer, where text extraction is refused (spec
    /// §4.4 "PDF extraction").
    pub async fn execute_on(
        &self,
        session: &BrowserSession,
        selector_map: &SelectorMap,
        is_pdf_viewer: bool,
        action: &Action,
    ) -> ActionResult {
        if is_pdf_viewer && matches!(action, Action::ExtractStructuredData { .. }) {
            return ActionResult {
                success: false,
                message: "extract_structured_data failed".to_string(),
                error: Some("cannot extract structured data while a PDF viewer is open".to_string()),
                extracted_content: None,
                include_extracted_content_only_once: false,
                long_term_memory: None,
            };
        }
        match self.dispatch(session, selector_map, action).await {
            Ok(result) => result,
            Err(err) => ActionResult {
                success: false,
                message: format!("{} failed", action.kind()),
                error: Some(err.to_string()),
                extracted_content: None,
                include_extracted_content_only_once: false,
                long_term_memory: None,
            },
        }
    }

    async fn dispatch(
        &self,
        session: &BrowserSession,
        selector_map: &SelectorMap,
        action: &Action,
    ) -> Result<ActionResult, ActionError> {
        match action {
            Action::GoToUrl { url, new_tab } => {
                if *new_tab {
                    session.create_new_tab(url).await?;
                } else {
                    session.navigate_to(url).await?;
                }
                Ok(ok(format!("navigated to {url}")))
            }
            Action::ClickElementByIndex { index } => {
                let entry = selector_map
                    .get(*index)
                    .ok_or(ActionError::ElementNotFound(*index))?;
                session.click(entry).await?;
                Ok(ok(format!("clicked element at index {index}")))
            }
            Action::TypeText { index, text } => {
                let entry = selector_map
                    .get(*index)
                    .ok_or(ActionError::ElementNotFound(*index))?;
                session.type_text(entry, text).await?;
                Ok(ok(format!("typed into element at index {index}")))
            }
            Action::Scroll { pixels } => {
                session.scroll(*pixels).await?;
                Ok(ok(format!("scrolled by {pixels}px")))
            }
            Action::Wait { seconds } => {
                tokio::time::sleep(std::time::Duration::from_secs(*seconds)).await;
                Ok(ok(format!("waited {seconds}s")))
            }
            Action::ExtractStructuredData { query, .. } => {
                let mut result = ok(format!("extraction requested: {query}"));
                result.extracted_content = Some(String::new());
                result.include_extracted_content_only_once = true;
                Ok(result)
            }
            Action::CreateNewTab { url } => {
                session.create_new_tab(url).await?;
                Ok(ok(format!("opened new tab at {url}")))
            }
            Action::SwitchToTab { index } => {
                session.switch_to_tab(*index)?;
                Ok(ok(format!("switched to tab {index}")))
            }
            Action::GoBack => {
                session.go_back().await?;
                Ok(ok("navigated back".to_string()))
            }
            Action::GoForward => {
                session.go_forward().await?;
                Ok(ok("navigated forward".to_string()))
            }
            Action::Refresh => {
                session.refresh().await?;
                Ok(ok("refreshed page".to_string()))
            }
            Action::Done { text, success, files } => Ok(ActionResult {
                success: *success,
                message: text.clone(),
                error: None,
                extracted_content: None,
                include_extracted_content_only_once: false,
                long_term_memory: if files.is_empty() {
                    None
                } else {
                    Some(format!("files: {}", files.join(", ")))
                },
            }),
        }
    }

    /// Runs `actions` in order against `session`, stopping after the first
    /// terminating action or the first action that changes the active
    /// page's URL (spec §4.4, §5 ordering guarantee).
    pub async fn multi_act(
        &self,
        session: &BrowserSession,
        selector_map: &SelectorMap,
        is_pdf_viewer: bool,
        actions: &[Action],
        cancel: &CancellationToken,
    ) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(actions.len());
        let mut prior_url = session.active_url().ok();

        for action in actions {
            if cancel.is_cancelled() {
                warn!(target: "action_controller.multi_act", "aborted before executing remaining actions");
                break;
            }

            let result = self.execute_on(session, selector_map, is_pdf_viewer, action).await;
            let terminating = action.is_terminating();
            results.push(result);

            if terminating {
                break;
            }

            let current_url = session.active_url().ok();
            if current_url != prior_url {
                break;
            }
            prior_url = current_url;
        }

        results
    }
}

fn ok(message: String) -> ActionResult {
    ActionResult {
        success: true,
        message,
        error: None,
        extracted_content: None,
        include_extracted_content_only_once: false,
        long_term_memory: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminating_actions_match_spec_list() {
        assert!(Action::GoToUrl { url: String::new(), new_tab: false }.is_terminating());
        assert!(Action::Done { text: String::new(), success: true, files: vec![] }.is_terminating());
        assert!(!Action::ClickElementByIndex { index: 1 }.is_terminating());
        assert!(!Action::Scroll { pixels: 10 }.is_terminating());
    }

    #[test]
    fn element_index_only_reported_for_click_and_type() {
        assert_eq!(Action::ClickElementByIndex { index: 3 }.element_index(), Some(3));
        assert_eq!(Action::TypeText { index: 4, text: "x".into() }.element_index(), Some(4));
        assert_eq!(Action::GoBack.element_index(), None);
    }

    #[test]
    fn action_json_is_externally_tagged_single_key() {
        let action = Action::ClickElementByIndex { index: 7 };
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("click_element_by_index").is_some());
        assert_eq!(json["click_element_by_index"]["index"], 7);
    }
}
