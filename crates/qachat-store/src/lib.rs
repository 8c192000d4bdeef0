//! Flat-file persistence for qachat
//!
//! Two stores live here:
//! - [`CredentialStore`]: username → account, one CSV file for everybody
//! - [`HistoryStore`]: username → conversation, one JSON file per user
//!
//! Both rewrite their files in full on every mutation, through
//! [`write_atomic`] so a crash never leaves a half-written file behind.

pub mod credentials;
pub mod error;
pub mod fs_utils;
pub mod history;

pub use credentials::{hash_password, CredentialStore};
pub use error::{RegisterError, StoreError};
pub use fs_utils::write_atomic;
pub use history::HistoryStore;
