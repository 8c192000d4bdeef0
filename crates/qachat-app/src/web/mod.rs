// Web frontend module
pub mod pages;
pub mod routes;
pub mod server;
pub mod session_manager;

pub use routes::{create_router, AppError, AppState};
pub use server::{WebServer, WebServerConfig};
pub use session_manager::{SessionGuard, SessionId, SessionManager, DEFAULT_IDLE_TIMEOUT, SESSION_COOKIE};
