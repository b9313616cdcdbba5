//! Syncer-specific error types

use shared::SharedError;
use storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncerError {
    #[error("Desired state store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Orchestrator unavailable: {message}")]
    OrchestratorUnavailable { message: String },

    #[error("Failed to create unit {unit}: {reason}")]
    CreateFailed { unit: String, reason: String },

    #[error("Failed to delete unit {unit}: {reason}")]
    DeleteFailed { unit: String, reason: String },

    #[error("Reconciler task failed: {message}")]
    TaskFailed { message: String },

    #[error("Configuration error: {field}")]
    Configuration { field: String },

    #[error("Shared component error")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncerError {
    pub fn orchestrator_unavailable(message: impl Into<String>) -> Self {
        Self::OrchestratorUnavailable { message: message.into() }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable { message: message.into() }
    }

    pub fn config(field: impl Into<String>) -> Self {
        Self::Configuration { field: field.into() }
    }
}

/// Any failure to obtain the desired-state snapshot aborts the pass the same way
impl From<StorageError> for SyncerError {
    fn from(err: StorageError) -> Self {
        SyncerError::StoreUnavailable {
            message: err.to_string(),
        }
    }
}

pub type SyncerResult<T> = Result<T, SyncerError>;
