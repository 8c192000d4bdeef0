use std::path::PathBuf;
use thiserror::Error;

/// Failures reading or writing the backing files
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path} is missing the '{column}' column")]
    MalformedStoreFile { path: PathBuf, column: &'static str },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("history file {path} is corrupted: {source}")]
    HistoryCorrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Why an account could not be created
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Rejected(#[from] qachat_types::AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
