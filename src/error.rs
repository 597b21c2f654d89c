use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FundingError {
    #[error("failed to read `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CSV input")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON input")]
    Json(#[from] serde_json::Error),
    #[error("failed to write output")]
    Write(#[source] std::io::Error),
    #[error("invalid settings file")]
    Toml(#[from] toml::de::Error),
    #[error("rate for `{0}` must be a finite, non-negative number")]
    InvalidRate(String),
    #[error("student type `{0}` is configured more than once")]
    DuplicateStudentType(String),
}

impl FundingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FundingError::Io {
            path: path.into(),
            source,
        }
    }
}
