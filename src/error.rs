use thiserror::Error;

/// A fetch that produced no document. Always transient: the URL stays unseen
/// and is retried when discovery yields it again.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

/// Failures that abort a whole cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("discovery failed: {0:#}")]
    Discovery(anyhow::Error),

    #[error("failed to persist corpus: {0:#}")]
    Persist(anyhow::Error),
}

#[derive(Debug, Error)]
#[error("invalid result count '{0}': expected 'max' or an integer > 0")]
pub struct ParseCountError(pub String);
