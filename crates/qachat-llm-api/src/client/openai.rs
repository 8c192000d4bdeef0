use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use qachat_types::ChatTurn;

use crate::client::{ClientOptions, LlmClient, LlmResponse, TokenUsage, Transport};
use crate::config::{normalize_api_url, BackendType, OPENAI_API_URL};
use crate::error::LlmError;

/// OpenAI-compatible `chat/completions` client
pub struct OpenAiClient {
    api_key: String,
    model: String,
    api_url: String,
    transport: Transport,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAiClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let transport = Transport::new(&options)?;
        let api_url = options
            .api_url
            .map(|url| normalize_api_url(&url))
            .unwrap_or_else(|| OPENAI_API_URL.to_string());
        Ok(Self {
            api_key: options.api_key,
            model: options.model,
            api_url,
            transport,
        })
    }

    pub fn build_request(&self, messages: &[ChatTurn]) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|turn| json!({ "role": turn.role.as_str(), "content": turn.text }))
            .collect();

        json!({
            "model": self.model,
            "messages": messages,
        })
    }

    pub fn parse_response(body: &str) -> Result<LlmResponse> {
        let chat_response: ChatResponse =
            serde_json::from_str(body).context("Failed to parse chat completion response")?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyResponse {
                backend: BackendType::OpenAI.display_name(),
            })?;

        Ok(LlmResponse {
            text,
            usage: chat_response.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }
}

fn extract_error(v: &Value) -> Option<String> {
    v["error"]["message"].as_str().map(|s| s.to_string())
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn backend(&self) -> BackendType {
        BackendType::OpenAI
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_completion(&self, messages: &[ChatTurn]) -> Result<LlmResponse> {
        let request = self.build_request(messages);
        let bearer = format!("Bearer {}", self.api_key);
        let body = self
            .transport
            .post_json(
                BackendType::OpenAI,
                &self.model,
                &self.api_url,
                ("Authorization", &bearer),
                &self.api_key,
                &request,
                extract_error,
            )
            .await?;
        Self::parse_response(&body)
    }
}
