//! Content worker error types

use pressforge_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Feed {url} could not be read: {message}")]
    Feed { url: String, message: String },

    #[error("Plan file {path} is unusable: {message}")]
    Plan { path: String, message: String },

    #[error("Converter failed: {0}")]
    Converter(String),

    #[error("Storefront error: {0}")]
    Storefront(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type WorkerResult<T> = std::result::Result<T, WorkerError>;
