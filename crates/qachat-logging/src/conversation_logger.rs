use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// What a log line records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    User,
    Assistant,
    Auth,
    Error,
}

#[derive(Serialize)]
struct LogEntry<'a> {
    timestamp: String, // ISO‑8601 Local time
    kind: LogKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

/// Append-only JSONL record of exchanges and account events
pub struct ConversationLogger {
    file_path: PathBuf,
    file: Option<tokio::fs::File>,
}

impl ConversationLogger {
    /// Create a new logger in `logs_dir`; the file name carries the current local time.
    pub async fn new(logs_dir: &Path) -> Result<Self> {
        fs::create_dir_all(logs_dir).await?;

        let filename = format!("qachat-{}.jsonl", Local::now().format("%Y-%m-%d-%H%M%S"));
        let file_path = logs_dir.join(filename);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await?;
        Ok(Self {
            file_path,
            file: Some(file),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Append a single log entry. Write failures are reported, never returned.
    pub async fn log(&mut self, kind: LogKind, username: Option<&str>, content: &str, model: Option<&str>) {
        let entry = LogEntry {
            timestamp: Local::now().to_rfc3339(),
            kind,
            username,
            content,
            model,
        };

        if let Some(file) = &mut self.file {
            if let Ok(mut json) = serde_json::to_string(&entry) {
                json.push('\n');
                if let Err(e) = file.write_all(json.as_bytes()).await {
                    eprintln!("[Logging error] {}", e);
                } else {
                    let _ = file.flush().await;
                }
            }
        }
    }

    /// Log a question and the reply it got
    pub async fn log_exchange(&mut self, username: &str, question: &str, reply: &str, model: &str) {
        self.log(LogKind::User, Some(username), question, None).await;
        self.log(LogKind::Assistant, Some(username), reply, Some(model)).await;
    }

    /// Log a sign-up, login, or logout
    pub async fn log_auth(&mut self, username: &str, event: &str) {
        self.log(LogKind::Auth, Some(username), event, None).await;
    }

    pub async fn log_error(&mut self, username: Option<&str>, message: &str) {
        self.log(LogKind::Error, username, message, None).await;
    }

    /// Close the logger (explicit drop). Called on graceful shutdown.
    pub async fn shutdown(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.sync_all().await;
        }
    }
}
