//! qachat application library
//!
//! The session state machine plus the two front ends that drive it: a
//! form-based web server and a terminal REPL.

pub use qachat_llm_api as llm_api;
pub use qachat_logging as logging;
pub use qachat_store as store;
pub use qachat_types as types;

pub mod app;
pub mod cli;
pub mod config;
pub mod session;
pub mod web;

pub use app::{build_controller, run_repl_mode, run_web_server, setup_from_cli, AppConfig};
pub use cli::Cli;
pub use session::{SessionContext, SessionController, SessionError, SessionState};
