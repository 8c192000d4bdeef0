use std::fs;
use std::path::{Path, PathBuf};

use qachat_types::{ChatTurn, Exchange, HISTORY_FILE_SUFFIX};

use crate::error::StoreError;
use crate::fs_utils::write_atomic;

/// Per-user conversation files, newest turn first
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Use `dir` for history files, creating it if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<username>_history.json`
    ///
    /// Callers pass usernames that went through `validate_username`.
    pub fn path_for(&self, username: &str) -> PathBuf {
        self.dir.join(format!("{}{}", username, HISTORY_FILE_SUFFIX))
    }

    /// Read a user's history. No file means no history yet.
    pub fn load(&self, username: &str) -> Result<Vec<ChatTurn>, StoreError> {
        let path = self.path_for(username);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        serde_json::from_str(&json).map_err(|source| StoreError::HistoryCorrupted { path, source })
    }

    /// Rewrite a user's history file with `turns`
    pub fn save(&self, username: &str, turns: &[ChatTurn]) -> Result<(), StoreError> {
        let path = self.path_for(username);
        let json = serde_json::to_vec(turns).map_err(|source| StoreError::Serialize {
            path: path.clone(),
            source,
        })?;
        write_atomic(&path, &json)
    }

    /// Put the exchange at the head of `turns` (reply first) and persist the result.
    ///
    /// If the write fails the two new turns are taken back out, so `turns`
    /// keeps matching what is on disk.
    pub fn append_and_save(
        &self,
        username: &str,
        turns: &mut Vec<ChatTurn>,
        exchange: Exchange,
    ) -> Result<(), StoreError> {
        turns.insert(0, exchange.question);
        turns.insert(0, exchange.reply);

        if let Err(e) = self.save(username, turns) {
            turns.drain(..2);
            return Err(e);
        }
        Ok(())
    }
}
