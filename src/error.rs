use thiserror::Error;

/// Errors raised while driving a scrape run.
///
/// `AnchorNotFound` and `NoSectionsFound` are fatal: the run aborts before any
/// section is touched and no report is produced. Everything raised inside a
/// single section's interaction is downgraded to a skip by the controller.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("header '{0}' not found on the page")]
    AnchorNotFound(String),

    #[error("no alphabet filter controls found below the header")]
    NoSectionsFound,

    #[error("section interaction failed: {0}")]
    Section(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("script evaluation failed: {0}")]
    Evaluation(String),
}

impl From<chromiumoxide::error::CdpError> for ScrapeError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScrapeError::Browser(err.to_string())
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(err: serde_json::Error) -> Self {
        ScrapeError::Evaluation(err.to_string())
    }
}

pub type ScrapeResult<T> = Result<T, ScrapeError>;
