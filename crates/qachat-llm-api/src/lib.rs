//! # qachat-llm-api
//!
//! Completion clients for the hosted models qachat talks to:
//! - Google Gemini (`generateContent`)
//! - OpenAI-compatible `chat/completions` endpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use qachat_llm_api::{BackendType, ClientFactory, ClientOptions};
//! use qachat_types::ChatTurn;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ClientFactory::create(
//!         BackendType::Gemini,
//!         ClientOptions::new("your-api-key", "gemini-pro"),
//!     )?;
//!
//!     let response = client.chat_completion(&[ChatTurn::user("Hello!")]).await?;
//!     println!("Response: {}", response.text);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{ClientOptions, LlmClient, LlmResponse, TokenUsage};
pub use config::{
    BackendType,
    ClientFactory,
    GEMINI_API_URL,
    OPENAI_API_URL,
    DEFAULT_GEMINI_MODEL,
    DEFAULT_OPENAI_MODEL,
    DEFAULT_TIMEOUT_SECS,
    normalize_api_url,
};
pub use error::LlmError;
