use anyhow::Result;
use std::env;
use std::sync::Arc;

use crate::client::{gemini::GeminiClient, openai::OpenAiClient, ClientOptions, LlmClient};
use crate::config::BackendType;
use crate::error::LlmError;

/// Client factory for creating LLM clients
pub struct ClientFactory;

impl ClientFactory {
    /// Create a completion client for `backend`.
    ///
    /// An empty `options.api_key` is filled from the backend's environment
    /// variables; if none is set the call fails with [`LlmError::MissingApiKey`].
    pub fn create(backend: BackendType, mut options: ClientOptions) -> Result<Arc<dyn LlmClient>> {
        if options.api_key.trim().is_empty() {
            options.api_key = Self::api_key_from_env(backend).ok_or(LlmError::MissingApiKey {
                backend: backend.display_name(),
                env_var: backend.api_key_env_vars()[0],
            })?;
        }
        if options.model.trim().is_empty() {
            options.model = backend.default_model().to_string();
        }

        Ok(match backend {
            BackendType::Gemini => Arc::new(GeminiClient::new(options)?),
            BackendType::OpenAI => Arc::new(OpenAiClient::new(options)?),
        })
    }

    /// First non-empty key among the backend's environment variables
    pub fn api_key_from_env(backend: BackendType) -> Option<String> {
        backend
            .api_key_env_vars()
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}
