use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("selector map index {0} did not resolve to an element")]
    ElementNotFound(u32),

    #[error("extract_structured_data is not permitted on a PDF viewer page")]
    ExtractionOnPdfViewer,

    #[error(transparent)]
    Session(#[from] browser_session::SessionError),
}
