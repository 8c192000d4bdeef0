use colored::Colorize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use qachat_llm_api::LlmClient;
use qachat_logging::ConversationLogger;
use qachat_store::{CredentialStore, HistoryStore};
use qachat_types::{Account, ChatTurn, Exchange, Page, DEFAULT_CONTEXT_TURNS};

use crate::session::error::SessionError;
use crate::session::state::{Notice, SessionContext, SessionState};

/// Drives a [`SessionContext`] through sign-up, login, chat and logout.
///
/// The controller owns the stores and the completion client; the context
/// owns everything that belongs to one user session. Every operation checks
/// the context's state first and fails with
/// [`SessionError::InvalidTransition`] without touching anything when the
/// action makes no sense there.
pub struct SessionController {
    credentials: CredentialStore,
    history: HistoryStore,
    client: Arc<dyn LlmClient>,
    logger: Option<ConversationLogger>,
    context_turns: usize,
}

impl SessionController {
    pub fn new(credentials: CredentialStore, history: HistoryStore, client: Arc<dyn LlmClient>) -> Self {
        Self {
            credentials,
            history,
            client,
            logger: None,
            context_turns: DEFAULT_CONTEXT_TURNS,
        }
    }

    pub fn with_logger(mut self, logger: ConversationLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// How many earlier turns go along with each question; 0 sends the question alone
    pub fn with_context_turns(mut self, context_turns: usize) -> Self {
        self.context_turns = context_turns;
        self
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn history_store(&self) -> &HistoryStore {
        &self.history
    }

    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    /// Switch an anonymous session to the sign-up form
    pub fn show_signup(&self, ctx: &mut SessionContext) -> Result<(), SessionError> {
        require_anonymous(ctx, "open the sign-up form")?;
        ctx.state = SessionState::Anonymous { page: Page::Signup };
        Ok(())
    }

    /// Switch an anonymous session to the login form
    pub fn show_login(&self, ctx: &mut SessionContext) -> Result<(), SessionError> {
        require_anonymous(ctx, "open the login form")?;
        ctx.state = SessionState::Anonymous { page: Page::Login };
        Ok(())
    }

    /// Create an account. On success the session lands on the login form
    /// with a success notice; on rejection it stays on the sign-up form.
    pub async fn sign_up(
        &mut self,
        ctx: &mut SessionContext,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, SessionError> {
        require_anonymous(ctx, "sign up")?;
        let username = username.trim();

        match self.credentials.register(username, email, password) {
            Ok(account) => {
                ctx.state = SessionState::Anonymous { page: Page::Login };
                ctx.notice = Some(Notice::success("Account created successfully! Please log in."));
                println!("{} New account: {}", "✓".green(), account.username);
                if let Some(logger) = &mut self.logger {
                    logger.log_auth(&account.username, "signup").await;
                }
                Ok(account)
            }
            Err(e) => {
                ctx.state = SessionState::Anonymous { page: Page::Signup };
                Err(e.into())
            }
        }
    }

    /// Check credentials and load the user's history into the context
    pub async fn login(
        &mut self,
        ctx: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<(), SessionError> {
        require_anonymous(ctx, "log in")?;
        let username = username.trim();

        if let Err(e) = self.credentials.authenticate(username, password) {
            if let Some(logger) = &mut self.logger {
                logger.log_auth(username, "login failed").await;
            }
            return Err(e.into());
        }

        let turns = self.history.load(username)?;

        ctx.histories.insert(username.to_string(), turns);
        ctx.pending_question = None;
        ctx.notice = None;
        ctx.state = SessionState::Authenticated {
            username: username.to_string(),
        };

        if let Some(logger) = &mut self.logger {
            logger.log_auth(username, "login").await;
        }
        Ok(())
    }

    /// Drop everything the session loaded and go back to the login form
    pub async fn logout(&mut self, ctx: &mut SessionContext) -> Result<(), SessionError> {
        let username = require_authenticated(ctx, "log out")?.to_string();

        ctx.reset();
        if let Some(logger) = &mut self.logger {
            logger.log_auth(&username, "logout").await;
        }
        Ok(())
    }

    /// Ask the completion service and record the exchange.
    ///
    /// Returns the reply. A failed completion leaves the history alone and
    /// keeps the question in `pending_question` for [`retry`](Self::retry).
    pub async fn submit(&mut self, ctx: &mut SessionContext, question: &str) -> Result<String, SessionError> {
        let username = require_authenticated(ctx, "ask a question")?.to_string();

        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let turns = loaded_history(&self.history, &mut ctx.histories, &username)?;

        let messages = build_messages(turns, question, self.context_turns);
        let response = match self.client.chat_completion(&messages).await {
            Ok(response) => response,
            Err(e) => {
                let message = format!("{:#}", e);
                eprintln!("{} Completion failed: {}", "❌".red(), message);
                ctx.pending_question = Some(question.to_string());
                if let Some(logger) = &mut self.logger {
                    logger.log_error(Some(&username), &message).await;
                }
                return Err(SessionError::Completion(message));
            }
        };

        ctx.pending_question = None;
        self.history
            .append_and_save(&username, turns, Exchange::new(question, response.text.clone()))?;

        if let Some(logger) = &mut self.logger {
            logger
                .log_exchange(&username, question, &response.text, self.client.model())
                .await;
        }
        Ok(response.text)
    }

    /// The logged-in user's turns, newest first, read from disk if the
    /// context does not hold them yet
    pub fn history<'a>(&self, ctx: &'a mut SessionContext) -> Result<&'a [ChatTurn], SessionError> {
        let username = require_authenticated(ctx, "read history")?.to_string();
        let turns = loaded_history(&self.history, &mut ctx.histories, &username)?;
        Ok(turns.as_slice())
    }

    /// Resubmit the question whose completion failed last
    pub async fn retry(&mut self, ctx: &mut SessionContext) -> Result<String, SessionError> {
        require_authenticated(ctx, "retry")?;
        let question = ctx.pending_question.clone().ok_or(SessionError::NothingToRetry)?;
        self.submit(ctx, &question).await
    }

    /// Flush the conversation log
    pub async fn shutdown(&mut self) {
        if let Some(logger) = &mut self.logger {
            logger.shutdown().await;
        }
    }
}

fn require_anonymous(ctx: &SessionContext, action: &'static str) -> Result<(), SessionError> {
    match ctx.state {
        SessionState::Anonymous { .. } => Ok(()),
        SessionState::Authenticated { .. } => Err(SessionError::InvalidTransition {
            action,
            state: ctx.state.describe(),
        }),
    }
}

fn require_authenticated<'a>(ctx: &'a SessionContext, action: &'static str) -> Result<&'a str, SessionError> {
    ctx.username().ok_or(SessionError::InvalidTransition {
        action,
        state: ctx.state.describe(),
    })
}

fn loaded_history<'a>(
    store: &HistoryStore,
    histories: &'a mut HashMap<String, Vec<ChatTurn>>,
    username: &str,
) -> Result<&'a mut Vec<ChatTurn>, SessionError> {
    match histories.entry(username.to_string()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => Ok(entry.insert(store.load(username)?)),
    }
}

/// The last `context_turns` turns, oldest first, followed by the question
pub fn build_messages(history: &[ChatTurn], question: &str, context_turns: usize) -> Vec<ChatTurn> {
    let mut messages: Vec<ChatTurn> = history.iter().take(context_turns).rev().cloned().collect();
    messages.push(ChatTurn::user(question));
    messages
}
