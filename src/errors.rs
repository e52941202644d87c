use thiserror::Error;

/// Application-specific error types.
///
/// Failure taxonomy for the pipeline: validation errors are rejected
/// before any work begins, scoring failures are surfaced to the caller,
/// transport failures are recorded per recipient by the dispatcher and
/// never abort a batch.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Bad or missing input, rejected pre-flight.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Requested lead does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Scoring service failure, surfaced as-is (no fabricated score).
    #[error("Scoring error: {0}")]
    Scoring(#[from] ScoringError),
    /// Mail transport failure for a single recipient.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Typed failures from the external scoring service.
#[derive(Debug, Clone, Error)]
pub enum ScoringError {
    /// Service could not be reached or answered with a non-success status.
    #[error("Scoring service unreachable: {0}")]
    Unreachable(String),
    /// Service answered but the body was not a usable score.
    #[error("Malformed scoring response: {0}")]
    MalformedResponse(String),
    /// Request exceeded its deadline.
    #[error("Scoring request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ScoringError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScoringError::Timeout
        } else if err.is_decode() {
            ScoringError::MalformedResponse(err.to_string())
        } else {
            ScoringError::Unreachable(err.to_string())
        }
    }
}
