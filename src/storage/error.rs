use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{what} not found: {document_id}")]
    NotFound { what: String, document_id: String },

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode json {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode yaml {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode {what}: {message}")]
    Encode { what: &'static str, message: String },

    #[error("invalid document id {document_id:?}: {reason}")]
    InvalidDocumentId {
        document_id: String,
        reason: &'static str,
    },

    #[error("unsupported final format: {0}")]
    UnsupportedFormat(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn not_found(what: impl Into<String>, document_id: &str) -> Self {
        StoreError::NotFound {
            what: what.into(),
            document_id: document_id.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
