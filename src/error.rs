use thiserror::Error;

/// Errors produced while submitting or running a generation session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Rejected before the session starts; shown inline, nothing is logged.
    #[error("{0}")]
    Validation(String),

    /// The workflow endpoint answered with a non-2xx status.
    #[error("Workflow trigger failed: {status_text}")]
    Dispatch { status: u16, status_text: String },

    #[error("invalid remote configuration: {0}")]
    InvalidConfig(String),

    #[error("an access token is required for remote dispatch")]
    MissingToken,

    #[error("request to workflow endpoint failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation task ended unexpectedly: {0}")]
    Task(String),
}

impl SessionError {
    pub fn empty_prompt() -> Self {
        SessionError::Validation("Please enter a text prompt".into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SessionError::Validation(_))
    }

    /// Message shown in the error panel when a running session fails.
    pub fn failure_message(&self) -> String {
        format!("Failed to generate video: {self}")
    }
}
