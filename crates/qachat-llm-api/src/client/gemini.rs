use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use qachat_types::{ChatTurn, Role};

use crate::client::{ClientOptions, LlmClient, LlmResponse, TokenUsage, Transport};
use crate::config::{BackendType, GEMINI_API_URL};
use crate::error::LlmError;

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    transport: Transport,
}

impl GeminiClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let transport = Transport::new(&options)?;
        let base_url = options
            .api_url
            .unwrap_or_else(|| GEMINI_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            api_key: options.api_key,
            model: options.model,
            base_url,
            transport,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Gemini calls the assistant "model"
    pub fn build_request(messages: &[ChatTurn]) -> Value {
        let contents: Vec<Value> = messages
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                json!({
                    "role": role,
                    "parts": [{ "text": turn.text }]
                })
            })
            .collect();

        json!({ "contents": contents })
    }

    pub fn parse_response(body: &str) -> Result<LlmResponse> {
        let v: Value = serde_json::from_str(body).context("Failed to parse Gemini response JSON")?;

        if let Some(message) = extract_error(&v) {
            return Err(LlmError::Api {
                backend: BackendType::Gemini.display_name(),
                status: 200,
                message,
            }
            .into());
        }

        let text: Option<String> = v["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .concat()
            })
            .filter(|text| !text.is_empty());

        let text = match text {
            Some(text) => text,
            None => {
                if let Some(reason) = v["promptFeedback"]["blockReason"].as_str() {
                    return Err(LlmError::Blocked {
                        backend: BackendType::Gemini.display_name(),
                        reason: reason.to_string(),
                    }
                    .into());
                }
                return Err(LlmError::EmptyResponse {
                    backend: BackendType::Gemini.display_name(),
                }
                .into());
            }
        };

        let usage = v.get("usageMetadata").map(|u| TokenUsage {
            prompt_tokens: u["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            completion_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
            total_tokens: u["totalTokenCount"].as_u64().unwrap_or(0) as u32,
        });

        Ok(LlmResponse { text, usage })
    }
}

fn extract_error(v: &Value) -> Option<String> {
    v.get("error").map(|error| {
        error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string()
    })
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn backend(&self) -> BackendType {
        BackendType::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_completion(&self, messages: &[ChatTurn]) -> Result<LlmResponse> {
        let request = Self::build_request(messages);
        let body = self
            .transport
            .post_json(
                BackendType::Gemini,
                &self.model,
                &self.endpoint(),
                ("x-goog-api-key", &self.api_key),
                &self.api_key,
                &request,
                extract_error,
            )
            .await?;
        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_request_maps_roles() {
        let request = GeminiClient::build_request(&[
            ChatTurn::user("hi"),
            ChatTurn::assistant("hello"),
            ChatTurn::user("how are you?"),
        ]);

        assert_eq!(
            request,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]},
                    {"role": "user", "parts": [{"text": "how are you?"}]}
                ]
            })
        );
    }

    #[test]
    fn test_parse_response_joins_parts_and_reads_usage() {
        let body = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello"}, {"text": ", world"}]}}],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 4, "totalTokenCount": 7}
        }"#;

        let response = GeminiClient::parse_response(body).unwrap();

        assert_eq!(response.text, "Hello, world");
        assert_eq!(
            response.usage,
            Some(TokenUsage {
                prompt_tokens: 3,
                completion_tokens: 4,
                total_tokens: 7
            })
        );
    }

    #[test]
    fn test_parse_response_reports_block_reason() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;

        let err = GeminiClient::parse_response(body).unwrap_err();

        assert!(err.to_string().contains("SAFETY"));
        assert!(matches!(
            err.downcast_ref::<LlmError>(),
            Some(LlmError::Blocked { .. })
        ));
    }

    #[test]
    fn test_parse_response_without_text_is_empty_error() {
        let err = GeminiClient::parse_response(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LlmError>(),
            Some(LlmError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn test_endpoint_accepts_prefixed_model_names() {
        let client = GeminiClient::new(
            ClientOptions::new("k", "models/gemini-pro").with_api_url("http://localhost:9999/"),
        )
        .unwrap();

        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-pro:generateContent"
        );
    }
}
