use thiserror::Error;

use crate::payment::gateway::GatewayError;
use crate::registration::types::{ApplicantId, Status};
use crate::registration::validation::ValidationError;

/// Infrastructure errors (startup, configuration, I/O).
///
/// Domain failures of a single event use [`RegistrationError`] instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Failure of one registration event. None of these are fatal to the process.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Bad wizard input; the applicant is re-prompted with the reason.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Someone other than the administrator tried an admin action.
    #[error("actor {actor} is not allowed to review submissions")]
    Unauthorized { actor: i64 },

    #[error("applicant {0} not found")]
    NotFound(ApplicantId),

    /// Approve/reject on a submission that was already ruled on.
    #[error("submission of applicant {applicant} was already decided ({status})")]
    AlreadyDecided { applicant: ApplicantId, status: Status },

    /// Registration restart while a submission is in flight.
    #[error("applicant {applicant} already has a submission in progress ({status})")]
    AlreadySubmitted { applicant: ApplicantId, status: Status },

    /// The operation is not defined for the record's current status.
    #[error("cannot {operation} while status is {status}")]
    InvalidState { operation: &'static str, status: Status },

    /// Payment provider call failed; the record is unchanged and retry is safe.
    #[error("payment gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl RegistrationError {
    /// Failures the applicant can fix by trying again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistrationError::Validation(_) | RegistrationError::Gateway(_))
    }
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;
