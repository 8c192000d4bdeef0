#![allow(dead_code)]

use serde_json::json;
use wiremock::matchers::*;
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "test-api-key";
pub const GEMINI_PATH: &str = "/v1beta/models/gemini-pro:generateContent";

/// Mock server utilities for testing completion clients
pub struct LlmMockServer {
    server: MockServer,
}

impl LlmMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub async fn received_bodies(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Mock successful Gemini reply, only for requests carrying the test key
    pub async fn mock_gemini_success(&self, response_content: &str) {
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .and(header("x-goog-api-key", TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": response_content }]
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": {
                    "promptTokenCount": 10,
                    "candidatesTokenCount": 20,
                    "totalTokenCount": 30
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock Gemini API error response
    pub async fn mock_gemini_error(&self, status: u16, error_message: &str) {
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": {
                    "code": status,
                    "message": error_message,
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_gemini_blocked(&self, reason: &str) {
        Mock::given(method("POST"))
            .and(path(GEMINI_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": reason }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock successful OpenAI-compatible reply
    pub async fn mock_openai_success(&self, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test123",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": response_content
                    },
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 5,
                    "completion_tokens": 7,
                    "total_tokens": 12
                }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_openai_rate_limit(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": "Rate limit exceeded",
                    "type": "rate_limit_error"
                }
            })))
            .mount(&self.server)
            .await;
    }
}
