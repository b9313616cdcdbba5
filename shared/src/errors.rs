//! Shared error types for the algorithm fleet syncer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Unknown algorithm kind: {input}")]
    UnknownAlgorithmKind { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
