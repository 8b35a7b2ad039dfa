use std::time::Duration;

/// Tunables for one `AgentLoop` run (spec §4.7).
#[derive(Clone, Debug)]
pub struct AgentLoopConfig {
    pub max_steps: u32,
    pub step_timeout: Duration,
    pub consecutive_failure_threshold: u32,
    pub url_shorten_limit: usize,
    /// Allows starting with sensitive data and no allowed-domain entry,
    /// after a blocking TTY warning (spec §4.7 "Sensitive data").
    pub allow_insecure_sensitive_data: bool,
    /// Draws index-labeled boxes over captured elements before each step's
    /// screenshot (spec §4.1 "highlight_elements").
    pub highlight_elements: bool,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            step_timeout: Duration::from_secs(120),
            consecutive_failure_threshold: 3,
            url_shorten_limit: 100,
            allow_insecure_sensitive_data: false,
            highlight_elements: true,
        }
    }
}
