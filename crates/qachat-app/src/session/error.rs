use qachat_store::{RegisterError, StoreError};
use qachat_types::AuthError;
use thiserror::Error;

/// Why a session action did not go through
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Please enter a question")]
    EmptyInput,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("The assistant could not answer: {0}")]
    Completion(String),

    #[error("Nothing to retry")]
    NothingToRetry,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// Completion failures keep the question around for `retry`
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Completion(_))
    }
}

impl From<RegisterError> for SessionError {
    fn from(err: RegisterError) -> Self {
        match err {
            RegisterError::Rejected(e) => SessionError::Auth(e),
            RegisterError::Store(e) => SessionError::Storage(e),
        }
    }
}
