use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaseError {
    #[error("File not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from PDF {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("report artifact error")]
    Artifact(#[from] rusqlite::Error),

    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration")]
    Config(#[from] config::ConfigError),
}
