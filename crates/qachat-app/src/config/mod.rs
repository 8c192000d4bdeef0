use std::path::{Path, PathBuf};

use qachat_types::{HISTORY_DIR_NAME, USERS_FILE_NAME};

pub mod helpers;

/// Where qachat keeps its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub data_dir: PathBuf,
    pub users_file: PathBuf,
    pub history_dir: PathBuf,
}

impl StorePaths {
    /// Default layout inside `data_dir`
    pub fn in_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            users_file: data_dir.join(USERS_FILE_NAME),
            history_dir: data_dir.join(HISTORY_DIR_NAME),
            data_dir,
        }
    }
}
