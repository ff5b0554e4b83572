use select_core::{SelectionError, ValidationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExperimentError>;

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid experiment file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid experiment: {0}")]
    Config(#[from] ValidationError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("no results to export")]
    NoResults,
}
