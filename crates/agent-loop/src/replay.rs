//! `rerun_history`: replays a previously recorded run against the live
//! session (spec §4.7 "Replay").

use std::sync::Arc;
use std::time::Duration;

use dom_serializer::{SelectorEntry, SelectorMap};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use action_controller::{Action, ActionController};
use browser_session::{ActionResult, BrowserSession};
use llm_client::{ChatMessage, InvokeOptions, LlmClient};

use crate::errors::AgentLoopError;

/// One step of a previously recorded run, reduced to what replay needs to
/// re-resolve and re-execute it.
#[derive(Clone, Debug)]
pub struct RecordedStep {
    pub action: Action,
    /// The element the action targeted when it was first recorded, if any.
    pub selector_entry: Option<SelectorEntry>,
    pub had_error: bool,
    pub step_interval: Duration,
    /// Index of a prior step in the same recording that opened the menu
    /// this step's element lives in, if the recording is of a menu
    /// interaction. Supplied by the recorder — replay has no independent
    /// way to detect "this is a menu item" from DOM structure alone.
    pub reopen_menu_step: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ReplayOptions {
    pub skip_failures: bool,
    pub wait_for_elements: bool,
    pub max_retries: u32,
    pub max_step_interval: Duration,
    pub element_wait_poll_interval: Duration,
    pub element_wait_timeout: Duration,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            skip_failures: false,
            wait_for_elements: true,
            max_retries: 3,
            max_step_interval: Duration::from_secs(5),
            element_wait_poll_interval: Duration::from_millis(250),
            element_wait_timeout: Duration::from_secs(10),
        }
    }
}

/// Tag+sorted-attribute-set hash that drops the drift-prone `class`
/// attribute (spec §4.7 replay tier 3), distinct from
/// `browser_session::HashCache`'s url-keyed novelty hash (which keeps the
/// xpath and exists to answer a different question — "is this node new
/// since the last capture", not "is this the same logical element as
/// before").
fn stable_element_hash(entry: &SelectorEntry) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(entry.tag.as_deref().unwrap_or("").as_bytes());
    for (key, value) in &entry.attributes {
        if key == "class" {
            continue;
        }
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

/// Re-resolves a historical element against the current selector map using
/// the spec's fixed tier order: backendNodeId, xpath, stable hash, ax_name.
pub fn resolve_element(historical: &SelectorEntry, current: &SelectorMap) -> Option<u32> {
    if let Some(id) = historical.backend_node_id {
        if let Some((idx, _)) = current
            .entries
            .iter()
            .find(|(_, e)| e.backend_node_id == Some(id))
        {
            return Some(*idx);
        }
    }
    if let Some((idx, _)) = current.entries.iter().find(|(_, e)| e.xpath == historical.xpath) {
        return Some(*idx);
    }
    let target_hash = stable_element_hash(historical);
    if let Some((idx, _)) = current
        .entries
        .iter()
        .find(|(_, e)| stable_element_hash(e) == target_hash)
    {
        return Some(*idx);
    }
    if let Some(name) = &historical.ax_name {
        if let Some((idx, _)) = current
            .entries
            .iter()
            .find(|(_, e)| e.ax_name.as_deref() == Some(name.as_str()))
        {
            return Some(*idx);
        }
    }
    None
}

fn rewrite_index(action: &Action, index: u32) -> Action {
    match action {
        Action::ClickElementByIndex { .. } => Action::ClickElementByIndex { index },
        Action::TypeText { text, .. } => Action::TypeText {
            index,
            text: text.clone(),
        },
        other => other.clone(),
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(5u64.saturating_mul(1 << attempt.min(4)))
}

pub struct ReplayRunner {
    session: Arc<BrowserSession>,
    controller: ActionController,
    extraction_llm: Option<Arc<dyn LlmClient>>,
    opts: ReplayOptions,
}

impl ReplayRunner {
    pub fn new(
        session: Arc<BrowserSession>,
        extraction_llm: Option<Arc<dyn LlmClient>>,
        opts: ReplayOptions,
    ) -> Self {
        Self {
            session,
            controller: ActionController::new(),
            extraction_llm,
            opts,
        }
    }

    pub async fn run(
        &self,
        steps: &[RecordedStep],
        cancel: &CancellationToken,
    ) -> Result<Vec<ActionResult>, AgentLoopError> {
        let mut results = Vec::with_capacity(steps.len());
        let mut last_resolution: Option<(&'static str, u32)> = None;

        for (i, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(AgentLoopError::Aborted);
            }
            if self.opts.skip_failures && step.had_error {
                continue;
            }

            let interval = step.step_interval.min(self.opts.max_step_interval);
            tokio::time::sleep(interval).await;

            let result = self
                .run_one(step, steps, i, cancel, &mut last_resolution)
                .await;
            results.push(result);
        }
        Ok(results)
    }

    async fn run_one(
        &self,
        step: &RecordedStep,
        all_steps: &[RecordedStep],
        index: usize,
        cancel: &CancellationToken,
        last_resolution: &mut Option<(&'static str, u32)>,
    ) -> ActionResult {
        if let Action::ExtractStructuredData { query, .. } = &step.action {
            return self.run_ai_fallback_extraction(query).await;
        }

        let Some(historical_entry) = &step.selector_entry else {
            return self
                .controller
                .execute(&self.session, &SelectorMap::default(), &step.action)
                .await;
        };

        if self.opts.wait_for_elements {
            if self.wait_for_element(historical_entry).await.is_err() {
                warn!(target: "agent_loop.replay", step = index, "element never became matchable");
            }
        }

        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return failed_result(AgentLoopError::Aborted.to_string());
            }

            let state = match self.capture_selector_map().await {
                Ok(map) => map,
                Err(err) => return failed_result(err.to_string()),
            };

            match resolve_element(historical_entry, &state) {
                Some(resolved_index) => {
                    let kind = step.action.kind();
                    if let Some((last_kind, last_index)) = *last_resolution {
                        if last_kind == kind && last_index == resolved_index {
                            return ActionResult {
                                success: true,
                                message: "skipped redundant retry of an already-succeeded action".to_string(),
                                error: None,
                                extracted_content: None,
                                include_extracted_content_only_once: false,
                                long_term_memory: None,
                            };
                        }
                    }
                    *last_resolution = Some((kind, resolved_index));
                    let rewritten = rewrite_index(&step.action, resolved_index);
                    let result = self.controller.execute(&self.session, &state, &rewritten).await;
                    if result.success {
                        return result;
                    }
                }
                None => {
                    if let Some(menu_step) = step.reopen_menu_step {
                        if let Some(menu_open) = all_steps.get(menu_step) {
                            let _ = self
                                .controller
                                .execute(&self.session, &state, &menu_open.action)
                                .await;
                        }
                    }
                }
            }

            attempt += 1;
            if attempt >= self.opts.max_retries {
                return failed_result(format!(
                    "could not re-resolve element after {attempt} attempts"
                ));
            }
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }

    async fn capture_selector_map(&self) -> Result<SelectorMap, AgentLoopError> {
        let state = self
            .session
            .capture(browser_session::CaptureRequestOptions {
                cache_hashes: false,
                include_screenshot: false,
                highlight_elements: false,
                viewport_expansion: 0,
            })
            .await?;
        Ok(state.selector_map)
    }

    async fn wait_for_element(&self, historical: &SelectorEntry) -> Result<(), ()> {
        let deadline = tokio::time::Instant::now() + self.opts.element_wait_timeout;
        while tokio::time::Instant::now() < deadline {
            if let Ok(map) = self.capture_selector_map().await {
                if resolve_element(historical, &map).is_some() {
                    return Ok(());
                }
            }
            tokio::time::sleep(self.opts.element_wait_poll_interval).await;
        }
        Err(())
    }

    async fn run_ai_fallback_extraction(&self, query: &str) -> ActionResult {
        let Some(client) = &self.extraction_llm else {
            return failed_result("no extraction model configured for replay fallback".to_string());
        };
        let messages = vec![
            ChatMessage::system("Extract the requested information from the current page."),
            ChatMessage::user(query.to_string()),
        ];
        match client.invoke(&messages, &InvokeOptions::default()).await {
            Ok(response) => ActionResult {
                success: true,
                message: "extracted via AI fallback".to_string(),
                error: None,
                extracted_content: response.completion.next_goal.clone(),
                include_extracted_content_only_once: true,
                long_term_memory: None,
            },
            Err(err) => failed_result(err.to_string()),
        }
    }
}

fn failed_result(error: String) -> ActionResult {
    ActionResult {
        success: false,
        message: "replay step failed".to_string(),
        error: Some(error),
        extracted_content: None,
        include_extracted_content_only_once: false,
        long_term_memory: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn entry(backend_node_id: Option<u64>, xpath: &str, tag: &str) -> SelectorEntry {
        SelectorEntry {
            backend_node_id,
            xpath: xpath.to_string(),
            tag: Some(tag.to_string()),
            attributes: BTreeMap::new(),
            ax_name: None,
            is_new: false,
            bounds: None,
        }
    }

    #[test]
    fn resolves_by_backend_node_id_first() {
        let historical = entry(Some(42), "/html/body/button[1]", "button");
        let mut map = SelectorMap::default();
        map.entries.insert(1, entry(Some(42), "/html/body/button[2]", "button"));
        assert_eq!(resolve_element(&historical, &map), Some(1));
    }

    #[test]
    fn falls_back_to_xpath_when_no_backend_node_id_match() {
        let historical = entry(None, "/html/body/button[1]", "button");
        let mut map = SelectorMap::default();
        map.entries.insert(3, entry(None, "/html/body/button[1]", "button"));
        assert_eq!(resolve_element(&historical, &map), Some(3));
    }

    #[test]
    fn stable_hash_ignores_class_attribute() {
        let mut a = entry(None, "/a", "button");
        a.attributes.insert("class".to_string(), "btn-old".to_string());
        a.attributes.insert("type".to_string(), "submit".to_string());
        let mut b = entry(None, "/b", "button");
        b.attributes.insert("class".to_string(), "btn-new".to_string());
        b.attributes.insert("type".to_string(), "submit".to_string());
        assert_eq!(stable_element_hash(&a), stable_element_hash(&b));
    }

    #[test]
    fn returns_none_when_nothing_matches() {
        let historical = entry(Some(1), "/x", "a");
        let map = SelectorMap::default();
        assert_eq!(resolve_element(&historical, &map), None);
    }
}
