//! Top-level CLI error type and exit-code mapping (spec §6, §7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    AgentLoop(#[from] agent_loop::AgentLoopError),

    #[error(transparent)]
    Session(#[from] browser_session::SessionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Runtime(String),
}

impl CliError {
    /// 0 success, 2 usage error, 1 runtime error (spec §6 "Exit codes").
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            _ => 1,
        }
    }
}
