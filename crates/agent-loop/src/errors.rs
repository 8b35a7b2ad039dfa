use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentLoopError {
    #[error(transparent)]
    Session(#[from] browser_session::SessionError),

    #[error(transparent)]
    Llm(#[from] llm_client::LlmError),

    #[error("operation was cancelled")]
    Aborted,

    #[error("step exceeded its deadline")]
    StepTimeout,

    #[error(
        "sensitive data was supplied but the session has no allowed-domain entry; refusing to start"
    )]
    SensitiveDataRequiresAllowedDomains,

    #[error("max_steps reached without the task signaling done")]
    MaxStepsReached,
}
