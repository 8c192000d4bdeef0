use thiserror::Error;

/// Rejections from sign-up and login. The user is re-prompted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Username already exists!")]
    DuplicateUsername(String),
    #[error("Username not found")]
    UnknownUsername(String),
    #[error("Incorrect password")]
    WrongPassword,
    #[error("Invalid username {0:?}: use 1-64 letters, digits, '.', '_' or '-'")]
    InvalidUsername(String),
}
