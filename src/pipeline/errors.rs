// Error types for the download pipeline

use thiserror::Error;

/// Failure classes surfaced by the pipeline.
///
/// Remote absence is not an error: resolvers report it as `Ok(None)` and the
/// cache evicts the entry so the next lookup retries. `NotFound` exists for
/// callers that need to turn an absent entity into a hard failure (e.g. a
/// download of a URL that resolves to nothing).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed URL or a URL missing a required query component
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Remote entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Manifest has no usable stream in the required container
    #[error("no suitable stream: {0}")]
    NoSuitableStream(String),

    /// Cooperative cancellation observed
    #[error("cancelled")]
    Cancelled,

    /// Any other I/O, network or remote failure during transfer
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// External encoder invocation failed
    #[error("encoder failed: {0}")]
    Encoder(String),

    /// Invalid pipeline configuration (e.g. unrecognized base folder)
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Whether this error is a cooperative cancellation rather than a failure.
    /// Callers translate cancellations into a neutral message, everything else
    /// into an error message.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        Self::TransferFailed(e.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::TransferFailed(e.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
