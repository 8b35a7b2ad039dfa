use domain_policy::DenialReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("navigation blocked: {0}")]
    UrlNotAllowed(DenialReason),

    #[error("element not found in current selector map")]
    ElementNotFound,

    #[error("unknown tab: {0}")]
    UnknownTab(u64),

    #[error("operation aborted")]
    Abort,

    #[error("operation timed out")]
    Timeout,

    #[error("fatal browser error: {0}")]
    BrowserError(String),

    #[error("cdp driver error: {0}")]
    Driver(#[from] cdp_adapter::AdapterError),
}
