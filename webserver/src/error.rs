//! WebServer-specific error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use shared::{process_error, ProcessId, SharedError};
use storage::StorageError;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("invalid request body: {details}")]
    BadRequest { details: String },

    #[error("client_name is already exists")]
    Conflict { client_name: String },

    #[error("client {client_id} not found")]
    NotFound { client_id: i64 },

    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("internal server error")]
    Internal { message: String },

    #[error("Server startup error: {0}")]
    ServerStartup(String),

    #[error("Shared component error")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WebServerError {
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::BadRequest { details: details.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WebServerError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            WebServerError::Conflict { .. } => StatusCode::CONFLICT,
            WebServerError::NotFound { .. } => StatusCode::NOT_FOUND,
            WebServerError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for WebServerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ClientConflict { client_name } => WebServerError::Conflict { client_name },
            StorageError::ClientNotFound { client_id } => WebServerError::NotFound { client_id },
            StorageError::Unavailable { message } => WebServerError::StoreUnavailable { message },
            other => WebServerError::Internal {
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for WebServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            // Internal details stay in the log, not in the response
            process_error!(ProcessId::current(), "❌ Request failed: {:?}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;
