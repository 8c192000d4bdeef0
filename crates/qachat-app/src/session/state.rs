use std::collections::HashMap;

use qachat_types::{ChatTurn, Page};
use serde::Serialize;

/// Where a session is in the sign-up/login flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous { page: Page },
    Authenticated { username: String },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Anonymous { page: Page::Login }
    }
}

impl SessionState {
    pub fn describe(&self) -> &'static str {
        match self {
            SessionState::Anonymous { .. } => "logged out",
            SessionState::Authenticated { .. } => "logged in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

/// One-shot message for the next render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Everything one front-end session knows between actions.
///
/// Built fresh per browser cookie or REPL run and handed to every
/// controller call. Logging out resets it to the default.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub state: SessionState,
    /// Loaded histories, newest turn first
    pub histories: HashMap<String, Vec<ChatTurn>>,
    /// Question whose completion failed, kept for retry
    pub pending_question: Option<String>,
    pub notice: Option<Notice>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { username } => Some(username),
            SessionState::Anonymous { .. } => None,
        }
    }

    /// Form shown to an anonymous session
    pub fn page(&self) -> Option<Page> {
        match self.state {
            SessionState::Anonymous { page } => Some(page),
            SessionState::Authenticated { .. } => None,
        }
    }

    /// The logged-in user's turns, newest first
    pub fn current_history(&self) -> &[ChatTurn] {
        self.username()
            .and_then(|u| self.histories.get(u))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    /// Nothing a fresh context would not also hold
    pub fn is_pristine(&self) -> bool {
        self.state == SessionState::default()
            && self.histories.is_empty()
            && self.pending_question.is_none()
            && self.notice.is_none()
    }

    /// Back to the login form with nothing loaded
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_is_anonymous_login() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.page(), Some(Page::Login));
        assert!(ctx.current_history().is_empty());
    }

    #[test]
    fn test_pristine_until_something_changes() {
        let mut ctx = SessionContext::new();
        assert!(ctx.is_pristine());

        ctx.notice = Some(Notice::info("hi"));
        assert!(!ctx.is_pristine());
        ctx.take_notice();
        assert!(ctx.is_pristine());

        ctx.state = SessionState::Anonymous { page: Page::Signup };
        assert!(!ctx.is_pristine());
        ctx.reset();
        assert!(ctx.is_pristine());
    }

    #[test]
    fn test_current_history_follows_username() {
        let mut ctx = SessionContext::new();
        ctx.histories
            .insert("alice".into(), vec![ChatTurn::assistant("a"), ChatTurn::user("q")]);
        assert!(ctx.current_history().is_empty());

        ctx.state = SessionState::Authenticated {
            username: "alice".into(),
        };
        assert_eq!(ctx.current_history().len(), 2);
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut ctx = SessionContext {
            state: SessionState::Authenticated {
                username: "bob".into(),
            },
            histories: HashMap::from([("bob".to_string(), vec![ChatTurn::user("x")])]),
            pending_question: Some("x".into()),
            notice: Some(Notice::info("hi")),
        };

        ctx.reset();

        assert_eq!(ctx.state, SessionState::default());
        assert!(ctx.histories.is_empty());
        assert!(ctx.pending_question.is_none());
        assert!(ctx.notice.is_none());
    }
}
