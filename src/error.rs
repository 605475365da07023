use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Output error: {0}")]
    OutputError(#[from] wrkbox_core::Error),
    #[error("Storage error: {0}")]
    StorageError(#[from] wrkbox_storage::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Suite not found: {0}")]
    SuiteNotFound(String),
    #[error("Suite declares {expected} configs but {actual} report files were given")]
    InputCount { expected: usize, actual: usize },
    #[error("{0} goal(s) failed")]
    GoalsFailed(usize),
}
