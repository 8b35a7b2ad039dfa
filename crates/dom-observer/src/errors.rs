use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("page not found: {0}")]
    PageNotFound(String),

    #[error("cdp driver error: {0}")]
    Driver(#[from] cdp_adapter::AdapterError),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}
