use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sentiment model not found at {0}; run `brandpulse train` first")]
    ModelMissing(PathBuf),

    #[error("invalid sentiment model: {0}")]
    ModelInvalid(String),

    #[error("training corpus contains no usable examples")]
    EmptyCorpus,

    #[error("classification worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl SentimentError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
