//! REST API handlers
//!
//! Client CRUD and algorithm flag endpoints. Bodies that fail to parse are
//! answered with 400; store errors map through `WebServerError`.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use shared::{process_info, AlgorithmFlags, AlgorithmStatus, Client, NewClient, ProcessId};
use storage::{ClientStore, DesiredStateReader};

use crate::error::{WebServerError, WebServerResult};
use crate::state::AppState;

/// Body of `PUT /api/client`: the id of the client plus every mutable field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub id: i64,
    #[serde(flatten)]
    pub fields: NewClient,
}

impl ClientUpdate {
    /// Timestamps are placeholders; the store keeps `created_at` and stamps `updated_at`
    fn into_client(self) -> Client {
        self.fields.into_client(self.id, Utc::now())
    }
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> WebServerResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| WebServerError::bad_request(rejection.body_text()))
}

/// Create client - POST /api/client
pub async fn add_client<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> WebServerResult<Json<Client>>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    let new_client = body(payload)?;
    if new_client.client_name.trim().is_empty() {
        return Err(WebServerError::bad_request("client_name must not be empty"));
    }

    let client = state.store.add_client(new_client).await?;
    process_info!(ProcessId::current(), "👤 Added client {} ({})", client.id, client.client_name);
    Ok(Json(client))
}

/// Update client - PUT /api/client
pub async fn update_client<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<ClientUpdate>, JsonRejection>,
) -> WebServerResult<Json<Client>>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    let update = body(payload)?;
    let client = state.store.update_client(update.into_client()).await?;
    process_info!(ProcessId::current(), "✏️ Updated client {}", client.id);
    Ok(Json(client))
}

/// Delete client and its algorithm record - DELETE /api/client/:id
pub async fn delete_client<S>(
    State(state): State<AppState<S>>,
    client_id: Result<Path<i64>, PathRejection>,
) -> WebServerResult<Json<Value>>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    let Path(client_id) = client_id.map_err(|rejection| WebServerError::bad_request(rejection.body_text()))?;
    state.store.delete_client(client_id).await?;
    process_info!(ProcessId::current(), "🗑️ Deleted client {}", client_id);
    Ok(Json(json!({ "status": "deleted", "id": client_id })))
}

/// Replace a client's algorithm flags - POST /api/algorithms
pub async fn update_algorithm_status<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<AlgorithmFlags>, JsonRejection>,
) -> WebServerResult<Json<AlgorithmStatus>>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    let flags = body(payload)?;
    let status = state.store.update_algorithm_status(flags).await?;
    process_info!(
        ProcessId::current(),
        "🎛️ Client {} algorithms: vwap={} twap={} hft={}",
        status.client_id,
        status.vwap,
        status.twap,
        status.hft
    );
    Ok(Json(status))
}

/// Desired-state snapshot as the syncer sees it - GET /api/algorithms
pub async fn list_algorithms<S>(State(state): State<AppState<S>>) -> WebServerResult<Json<Vec<AlgorithmStatus>>>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    Ok(Json(state.store.list_desired_algorithm_states().await?))
}

/// Health check - GET /health
pub async fn health_check<S>(State(state): State<AppState<S>>) -> Json<Value>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    Json(json!({
        "status": "ok",
        "uptime_seconds": state.uptime_seconds(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
