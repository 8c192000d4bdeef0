use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use qachat_types::ChatTurn;

use crate::session::{Notice, SessionController, SessionError};
use crate::web::pages;
use crate::web::session_manager::{session_cookie, session_id_from_headers, SessionId, SessionManager};

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Mutex<SessionController>>,
    pub sessions: Arc<SessionManager>,
    pub title: Arc<str>,
}

impl AppState {
    pub fn new(controller: SessionController) -> Self {
        Self::with_sessions(controller, SessionManager::new())
    }

    pub fn with_sessions(controller: SessionController, sessions: SessionManager) -> Self {
        let title = format!("Q&A with {}", controller.client().backend().display_name());
        Self {
            controller: Arc::new(Mutex::new(controller)),
            sessions: Arc::new(sessions),
            title: title.into(),
        }
    }
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/signup", get(show_signup).post(sign_up))
        .route("/login", get(show_login).post(login))
        .route("/logout", post(logout))
        .route("/ask", post(ask))
        .route("/retry", post(retry))
        .route("/api/history", get(api_history))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

/// The browser's session id, minted when the request carries none
struct BrowserSession {
    id: SessionId,
    is_new: bool,
}

impl BrowserSession {
    fn from_headers(headers: &HeaderMap) -> Self {
        match session_id_from_headers(headers) {
            Some(id) => Self { id, is_new: false },
            None => Self {
                id: Uuid::new_v4(),
                is_new: true,
            },
        }
    }

    fn respond(&self, response: impl IntoResponse) -> Response {
        if self.is_new {
            ([(header::SET_COOKIE, session_cookie(&self.id))], response).into_response()
        } else {
            response.into_response()
        }
    }

    /// Post/redirect/get back to the page
    fn redirect_home(&self) -> Response {
        self.respond(Redirect::to("/"))
    }
}

fn error_notice(err: &SessionError) -> Notice {
    match err {
        SessionError::EmptyInput => Notice::info(err.to_string()),
        _ => Notice::error(err.to_string()),
    }
}

/// GET / - Render the current page
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    let notice = ctx.take_notice();
    let html = pages::render(&ctx, notice.as_ref(), &state.title);

    state.sessions.release(ctx).await;
    browser.respond(Html(html))
}

/// GET /signup - Show the sign-up form
async fn show_signup(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    if let Err(e) = state.controller.lock().await.show_signup(&mut ctx) {
        ctx.notice = Some(error_notice(&e));
    }

    state.sessions.release(ctx).await;
    browser.redirect_home()
}

/// GET /login - Show the login form
async fn show_login(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    if let Err(e) = state.controller.lock().await.show_login(&mut ctx) {
        ctx.notice = Some(error_notice(&e));
    }

    state.sessions.release(ctx).await;
    browser.redirect_home()
}

/// POST /signup - Create an account
async fn sign_up(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SignupForm>,
) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    {
        let mut controller = state.controller.lock().await;
        if let Err(e) = controller
            .sign_up(&mut ctx, &form.username, &form.email, &form.password)
            .await
        {
            ctx.notice = Some(error_notice(&e));
        }
    }

    state.sessions.release(ctx).await;
    browser.redirect_home()
}

/// POST /login - Log in and load history
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    {
        let mut controller = state.controller.lock().await;
        if let Err(e) = controller.login(&mut ctx, &form.username, &form.password).await {
            ctx.notice = Some(error_notice(&e));
        }
    }

    state.sessions.release(ctx).await;
    browser.redirect_home()
}

/// POST /logout - Log out
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    if let Err(e) = state.controller.lock().await.logout(&mut ctx).await {
        ctx.notice = Some(error_notice(&e));
    }

    state.sessions.release(ctx).await;
    browser.redirect_home()
}

/// POST /ask - Submit a question
async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    {
        let mut controller = state.controller.lock().await;
        if let Err(e) = controller.submit(&mut ctx, &form.question).await {
            ctx.notice = Some(error_notice(&e));
        }
    }

    state.sessions.release(ctx).await;
    browser.redirect_home()
}

/// POST /retry - Resubmit the last failed question
async fn retry(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    {
        let mut controller = state.controller.lock().await;
        if let Err(e) = controller.retry(&mut ctx).await {
            ctx.notice = Some(error_notice(&e));
        }
    }

    state.sessions.release(ctx).await;
    browser.redirect_home()
}

/// GET /api/history - The logged-in user's history as JSON, newest first
async fn api_history(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let browser = BrowserSession::from_headers(&headers);
    let mut ctx = state.sessions.checkout(browser.id).await;

    let result = {
        let controller = state.controller.lock().await;
        controller.history(&mut ctx).map(|turns| turns.to_vec())
    };
    let username = ctx.username().map(str::to_string);
    state.sessions.release(ctx).await;

    let turns: Vec<ChatTurn> = result?;
    let body = Json(serde_json::json!({
        "username": username,
        "turns": turns
            .iter()
            .map(|t| serde_json::json!({ "role": t.role.as_str(), "text": t.text }))
            .collect::<Vec<_>>(),
    }));
    Ok(browser.respond(body))
}

/// Errors for the JSON API
#[derive(Debug)]
pub enum AppError {
    Session(SessionError),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Session(err @ SessionError::InvalidTransition { .. }) => {
                (StatusCode::UNAUTHORIZED, format!("Not logged in ({})", err))
            }
            AppError::Session(err @ SessionError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            AppError::Session(err) => (StatusCode::BAD_REQUEST, err.to_string()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
