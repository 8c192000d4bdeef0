//! Session state machine: anonymous forms, login, and the chat loop

pub mod controller;
pub mod error;
pub mod state;

pub use controller::{build_messages, SessionController};
pub use error::SessionError;
pub use state::{Notice, NoticeKind, SessionContext, SessionState};
