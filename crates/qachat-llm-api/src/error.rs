use thiserror::Error;

/// Completion failures that carry a meaning beyond "the request broke"
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{backend} API error ({status}): {message}")]
    Api {
        backend: &'static str,
        status: u16,
        message: String,
    },

    #[error("{backend} returned no text")]
    EmptyResponse { backend: &'static str },

    #[error("{backend} blocked the prompt: {reason}")]
    Blocked { backend: &'static str, reason: String },

    #[error("no API key configured for {backend}; set {env_var}")]
    MissingApiKey {
        backend: &'static str,
        env_var: &'static str,
    },
}
