use crate::import::ImportError;

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing, expired or rejected token. Always ends the session.
    Authentication,
    /// Valid session without the required privilege.
    Authorization,
    /// Bad form input or import data; nothing was sent or it can be retried.
    Validation,
    /// Network failure, unexpected status or malformed response.
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    /// The backend answered 2xx but flagged the call as unsuccessful.
    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Malformed server response: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("Local storage error: {0}")]
    Storage(String),
}

impl ConsoleError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ConsoleError::Unauthorized => ErrorClass::Authentication,
            ConsoleError::Forbidden(_) => ErrorClass::Authorization,
            ConsoleError::Validation(_) | ConsoleError::Import(_) => ErrorClass::Validation,
            ConsoleError::Http { .. }
            | ConsoleError::Rejected(_)
            | ConsoleError::Transport(_)
            | ConsoleError::Decode(_)
            | ConsoleError::Storage(_) => ErrorClass::Transport,
        }
    }
}

pub type ConsoleResult<T> = Result<T, ConsoleError>;
