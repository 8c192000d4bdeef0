//! Core types and structures for qachat
//!
//! This crate provides the foundational types used across all qachat crates.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

pub mod error;

pub use error::AuthError;

// ============================================================================
// Constants
// ============================================================================

/// Default number of prior turns sent along with a new question
pub const DEFAULT_CONTEXT_TURNS: usize = 20;

/// Number of most recent turns rendered inline; the rest go in the history panel
pub const INLINE_TURNS: usize = 2;

/// Maximum username length (usernames are also file names)
pub const MAX_USERNAME_LEN: usize = 64;

/// Default credential file name inside the data directory
pub const USERS_FILE_NAME: &str = "user_data.csv";

/// Default history directory name inside the data directory
pub const HISTORY_DIR_NAME: &str = "chat_histories";

/// Suffix appended to the username to form its history file name
pub const HISTORY_FILE_SUFFIX: &str = "_history.json";

// ============================================================================
// Accounts
// ============================================================================

/// One row of the credential file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(alias = "password")]
    pub password_hash: String,
}

/// Check that a username is usable as a store key and a file name
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.-]+$").expect("username pattern is valid")
    });

    if username.is_empty()
        || username.len() > MAX_USERNAME_LEN
        || username == "."
        || username == ".."
        || !pattern.is_match(username)
    {
        return Err(AuthError::InvalidUsername(username.to_string()));
    }
    Ok(())
}

// ============================================================================
// Chat Turns
// ============================================================================

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user", alias = "You")]
    User,
    #[serde(rename = "assistant", alias = "Gemini")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
///
/// Serialized as a two-element array `[role, text]`, the layout of the
/// per-user history files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Role, String)", into = "(Role, String)")]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

impl From<(Role, String)> for ChatTurn {
    fn from((role, text): (Role, String)) -> Self {
        Self { role, text }
    }
}

impl From<ChatTurn> for (Role, String) {
    fn from(turn: ChatTurn) -> Self {
        (turn.role, turn.text)
    }
}

/// A user question and the reply it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: ChatTurn,
    pub reply: ChatTurn,
}

impl Exchange {
    pub fn new(question: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            question: ChatTurn::user(question),
            reply: ChatTurn::assistant(reply),
        }
    }
}

// ============================================================================
// Session Pages
// ============================================================================

/// Which form an anonymous visitor is looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Signup,
    #[default]
    Login,
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Signup => "signup",
            Page::Login => "login",
        }
    }
}
