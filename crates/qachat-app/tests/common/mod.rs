#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use qachat::session::SessionController;
use qachat_llm_api::{BackendType, LlmClient, LlmResponse};
use qachat_store::{CredentialStore, HistoryStore};
use qachat_types::ChatTurn;

/// Completion client that replays canned answers and records every request
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<Vec<ChatTurn>>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn fail(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    /// Make every completion take `delay`
    pub fn slow(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn requests(&self) -> Vec<Vec<ChatTurn>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn backend(&self) -> BackendType {
        BackendType::Gemini
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn chat_completion(&self, messages: &[ChatTurn]) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(LlmResponse { text, usage: None }),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }
}

/// Controller over fresh stores in `dir`
pub fn controller_in(dir: &TempDir, client: Arc<dyn LlmClient>) -> SessionController {
    let credentials = CredentialStore::open(dir.path().join("user_data.csv")).unwrap();
    let history = HistoryStore::new(dir.path().join("chat_histories")).unwrap();
    SessionController::new(credentials, history, client)
}
