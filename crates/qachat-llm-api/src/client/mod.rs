use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use qachat_logging::{log_request, log_request_to_file, log_response, log_response_to_file};
use qachat_types::ChatTurn;

use crate::config::{BackendType, DEFAULT_TIMEOUT_SECS};
use crate::error::LlmError;

pub mod gemini;
pub mod openai;

/// Completion client trait - one call per user question
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn backend(&self) -> BackendType;

    fn model(&self) -> &str;

    /// Ask for the next assistant turn.
    ///
    /// `messages` is oldest first and ends with the new user question.
    async fn chat_completion(&self, messages: &[ChatTurn]) -> Result<LlmResponse>;
}

/// LLM response structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Settings shared by every backend
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_key: String,
    pub model: String,
    /// Overrides the backend's default endpoint
    pub api_url: Option<String>,
    pub timeout: Duration,
    /// Dump requests and responses to the console
    pub verbose: bool,
    /// Write request/response log files here when set
    pub logs_dir: Option<PathBuf>,
}

impl ClientOptions {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verbose: false,
            logs_dir: None,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = Some(api_url.into());
        self
    }
}

/// HTTP plumbing shared by the concrete clients
pub(crate) struct Transport {
    http: reqwest::Client,
    verbose: bool,
    logs_dir: Option<PathBuf>,
}

impl Transport {
    pub(crate) fn new(options: &ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            verbose: options.verbose,
            logs_dir: options.logs_dir.clone(),
        })
    }

    /// POST `body` as JSON and return the response body of a 2xx reply.
    ///
    /// Non-2xx replies become [`LlmError::Api`], with the message pulled out
    /// by `extract_error` when the body has one.
    pub(crate) async fn post_json(
        &self,
        backend: BackendType,
        model: &str,
        url: &str,
        auth: (&str, &str),
        api_key: &str,
        body: &serde_json::Value,
        extract_error: fn(&serde_json::Value) -> Option<String>,
    ) -> Result<String> {
        let (auth_header, auth_value) = auth;
        let timestamp = chrono::Utc::now().timestamp_millis();

        log_request(url, auth_header, api_key, body, self.verbose);
        if let Some(dir) = &self.logs_dir {
            if let Err(e) = log_request_to_file(dir, url, body, model, api_key, timestamp) {
                eprintln!("{} {}", "⚠️".yellow(), e);
            }
        }

        let response = self
            .http
            .post(url)
            .header("Content-Type", "application/json")
            .header(auth_header, auth_value)
            .json(body)
            .send()
            .await
            .with_context(|| format!("{} request failed", backend.display_name()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read {} response", backend.display_name()))?;

        log_response(&status, &headers, &text, self.verbose);
        if let Some(dir) = &self.logs_dir {
            if let Err(e) = log_response_to_file(dir, &status, &text, model, timestamp) {
                eprintln!("{} {}", "⚠️".yellow(), e);
            }
        }

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| extract_error(&v))
                .unwrap_or(text);
            return Err(LlmError::Api {
                backend: backend.display_name(),
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(text)
    }
}
