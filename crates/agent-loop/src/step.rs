//! One iteration of the agent loop (spec §4.7 "One step").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use action_controller::{Action, ActionController};
use agent_history::{AgentHistory, AgentOutput};
use browser_session::{BrowserSession, CaptureRequestOptions};
use llm_client::{ChatMessage, InvokeOptions, LlmClient, LlmError};
use prompt_assembler::{AgentState, PromptAssembler, PromptInputs, StepInfo};

use crate::config::AgentLoopConfig;
use crate::errors::AgentLoopError;
use crate::sensitive_data::{substitute_into_action, SensitiveDataMap};
use crate::url_shortening::UrlShortener;

/// What the caller should do after a step completes.
pub enum StepOutcome {
    Continue,
    Done,
}

pub struct AgentLoop {
    session: Arc<BrowserSession>,
    controller: ActionController,
    assembler: PromptAssembler,
    pub history: AgentHistory,
    primary_llm: Arc<dyn LlmClient>,
    fallback_llm: Option<Arc<dyn LlmClient>>,
    use_fallback: AtomicBool,
    config: AgentLoopConfig,
    user_request: String,
    sensitive_data: Option<SensitiveDataMap>,
    consecutive_failures: u32,
    step_number: u32,
    url_shortener: UrlShortener,
}

impl AgentLoop {
    /// Refuses to build when sensitive data is configured but the session
    /// allows every domain (spec §4.7: "refuses to start when sensitive
    /// data is present without at least one allowed-domain entry").
    pub fn new(
        session: Arc<BrowserSession>,
        primary_llm: Arc<dyn LlmClient>,
        fallback_llm: Option<Arc<dyn LlmClient>>,
        user_request: String,
        sensitive_data: Option<SensitiveDataMap>,
        allowed_domains_configured: bool,
        config: AgentLoopConfig,
    ) -> Result<Self, AgentLoopError> {
        if sensitive_data.is_some() && !allowed_domains_configured && !config.allow_insecure_sensitive_data {
            return Err(AgentLoopError::SensitiveDataRequiresAllowedDomains);
        }
        let url_shortener = UrlShortener::new(config.url_shorten_limit);
        Ok(Self {
            session,
            controller: ActionController::new(),
            assembler: PromptAssembler::new(),
            history: AgentHistory::new(),
            primary_llm,
            fallback_llm,
            use_fallback: AtomicBool::new(false),
            config,
            user_request,
            sensitive_data,
            consecutive_failures: 0,
            step_number: 0,
            url_shortener,
        })
    }

    fn active_client(&self) -> Arc<dyn LlmClient> {
        if self.use_fallback.load(Ordering::SeqCst) {
            self.fallback_llm.clone().unwrap_or_else(|| self.primary_llm.clone())
        } else {
            self.primary_llm.clone()
        }
    }

    /// Invokes the active LLM, swapping to the fallback exactly once on a
    /// retryable failure and retrying with it (spec §4.7 "LLM retry/fallback").
    async fn invoke_with_retry(
        &self,
        messages: &[ChatMessage],
    ) -> Result<llm_client::CompletionResponse, LlmError> {
        let client = self.active_client();
        match client.invoke(messages, &InvokeOptions::default()).await {
            Ok(response) => Ok(response),
            Err(err) if err.triggers_fallback_swap() && self.fallback_llm.is_some() => {
                if !self.use_fallback.swap(true, Ordering::SeqCst) {
                    warn!(target: "agent_loop.retry", error = %err, "switching to fallback model");
                }
                let fallback = self.fallback_llm.clone().unwrap();
                fallback.invoke(messages, &InvokeOptions::default()).await
            }
            Err(err) => Err(err),
        }
    }

    /// Runs one step, honoring `cancel` at every suspension point and the
    /// configured step deadline (spec §4.7, §5 "Cancellation semantics").
    pub async fn step(&mut self, cancel: &CancellationToken) -> Result<StepOutcome, AgentLoopError> {
        if cancel.is_cancelled() {
            return Err(AgentLoopError::Aborted);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentLoopError::Aborted),
            result = tokio::time::timeout(self.config.step_timeout, self.run_step_body(cancel)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(AgentLoopError::StepTimeout),
                }
            }
        }
    }

    async fn run_step_body(&mut self, cancel: &CancellationToken) -> Result<StepOutcome, AgentLoopError> {
        let state = self
            .session
            .capture(CaptureRequestOptions {
                cache_hashes: true,
                include_screenshot: true,
                highlight_elements: self.config.highlight_elements,
                viewport_expansion: 0,
            })
            .await?;

        let stuck_hint = if self.consecutive_failures >= self.config.consecutive_failure_threshold {
            Some(format!(
                "The last {} steps failed in a row. Reconsider the approach before retrying.",
                self.consecutive_failures
            ))
        } else {
            None
        };

        let agent_state = AgentState {
            user_request: self.user_request.clone(),
            file_system: None,
            todo_contents: None,
        };
        let step_info = StepInfo {
            step_number: self.step_number,
            max_steps: self.config.max_steps,
        };
        let read_state = self.history.read_state_description.clone();
        let history_rendered = self.history.render_all();
        let inputs = PromptInputs {
            history_rendered: &history_rendered,
            agent_state: &agent_state,
            step_info: &step_info,
            browser_state: &state,
            read_state: read_state.as_deref(),
            page_specific_actions: stuck_hint.as_deref(),
        };
        let prompt = self.assembler.build(&inputs);
        let (prompt, reverse_map) = self.url_shortener.shorten(&prompt);

        let messages = vec![
            ChatMessage::system("You are a browser automation agent. Respond with one structured action plan per step."),
            ChatMessage::user(prompt),
        ];

        if cancel.is_cancelled() {
            return Err(AgentLoopError::Aborted);
        }

        let output = match self.invoke_with_retry(&messages).await {
            Ok(response) => response.completion,
            Err(LlmError::Parse(err)) => {
                warn!(target: "agent_loop.step", error = %err, "model output failed to parse");
                self.consecutive_failures += 1;
                self.history.update(self.step_number, None, &[], &[]);
                self.step_number += 1;
                return Ok(StepOutcome::Continue);
            }
            Err(err) => return Err(AgentLoopError::Llm(err)),
        };

        let restored_output = restore_shortened_urls(&output, &reverse_map);

        let current_url = state.url.clone();
        let actions: Vec<Action> = restored_output
            .action
            .iter()
            .map(|action| match &self.sensitive_data {
                Some(map) => substitute_into_action(action, &current_url, map),
                None => action.clone(),
            })
            .collect();

        let results = self
            .controller
            .multi_act(&self.session, &state.selector_map, state.is_pdf_viewer, &actions, cancel)
            .await;

        self.history
            .update(self.step_number, Some(&restored_output), &results, &actions);
        self.step_number += 1;

        let any_failed = results.iter().any(|r| !r.success);
        if any_failed {
            self.consecutive_failures += 1;
        } else {
            self.consecutive_failures = 0;
        }

        let signaled_done = actions
            .iter()
            .zip(results.iter())
            .any(|(action, result)| action.is_done() && result.error.is_none());
        if signaled_done {
            info!(target: "agent_loop.step", step = self.step_number, "task signaled done");
            return Ok(StepOutcome::Done);
        }

        Ok(StepOutcome::Continue)
    }

    /// Drives `step` until the task signals done or `max_steps` is
    /// exhausted (spec §4.7 "Scheduling model": exactly one step in
    /// flight at a time).
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), AgentLoopError> {
        loop {
            if self.step_number >= self.config.max_steps {
                return Err(AgentLoopError::MaxStepsReached);
            }
            match self.step(cancel).await? {
                StepOutcome::Done => return Ok(()),
                StepOutcome::Continue => {}
            }
        }
    }
}

fn restore_shortened_urls(
    output: &AgentOutput,
    map: &crate::url_shortening::ReverseMap,
) -> AgentOutput {
    AgentOutput {
        thinking: output.thinking.clone(),
        evaluation_previous_goal: output.evaluation_previous_goal.clone(),
        memory: output.memory.clone(),
        next_goal: output.next_goal.as_ref().map(|g| map.restore(g)),
        action: output.action.clone(),
    }
}
