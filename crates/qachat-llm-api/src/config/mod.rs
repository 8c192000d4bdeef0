use std::fmt;
use std::str::FromStr;

pub mod factory;
pub use factory::ClientFactory;

/// Backend type for completion models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendType {
    #[default]
    Gemini,
    OpenAI,
}

impl BackendType {
    /// Parse backend type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" | "genai" => Some(Self::Gemini),
            "openai" | "openai-compatible" => Some(Self::OpenAI),
            _ => None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
        }
    }

    /// Name used in log lines and error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::OpenAI => "OpenAI",
        }
    }

    /// Environment variables searched for an API key, in order
    pub fn api_key_env_vars(&self) -> &'static [&'static str] {
        match self {
            Self::Gemini => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            Self::OpenAI => &["OPENAI_API_KEY"],
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_MODEL,
            Self::OpenAI => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            Self::Gemini => GEMINI_API_URL,
            Self::OpenAI => OPENAI_API_URL,
        }
    }
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown backend '{}' (expected gemini or openai)", s))
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default Gemini API base URL; the model path is appended per request
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Default OpenAI API URL
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Normalize API URL by ensuring it has the correct path for OpenAI-compatible endpoints
pub fn normalize_api_url(url: &str) -> String {
    if url.contains("/completions") || url.contains("/chat") {
        return url.to_string();
    }

    if url.ends_with('/') {
        format!("{}v1/chat/completions", url)
    } else {
        format!("{}/v1/chat/completions", url)
    }
}
