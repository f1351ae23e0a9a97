use thiserror::Error;

/// Failures that never leave the process: the request is rejected before
/// any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Please enter a valid 10-digit phone number")]
    InvalidPhone,

    #[error("Please enter a valid 6-digit OTP")]
    InvalidOtp,

    #[error("Invalid time slot: {0}")]
    InvalidTimeSlot(String),

    #[error("{0}")]
    Form(String),
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No response from server: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Not allowed right now: {0}")]
    InvalidState(&'static str),
}

impl ApiError {
    /// Message suitable for a notification body
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } | Self::VerificationFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
