//! Storage-specific error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Client name already exists: {client_name}")]
    ClientConflict { client_name: String },

    #[error("Client not found: {client_id}")]
    ClientNotFound { client_id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    /// True when the store could not be reached, as opposed to rejecting a request
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
