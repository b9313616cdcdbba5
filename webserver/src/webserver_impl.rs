//! Main webserver implementation
//!
//! Builds the router over an injected store and serves it until the given
//! shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use shared::{process_info, ProcessId};
use storage::{ClientStore, DesiredStateReader};

use crate::error::{WebServerError, WebServerResult};
use crate::state::AppState;
use crate::web::handlers::{
    add_client, delete_client, health_check, list_algorithms, update_algorithm_status, update_client,
};

/// CRUD API server with dependency-injected store
pub struct WebServer<S>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    bind_address: SocketAddr,
    state: AppState<S>,
}

impl<S> WebServer<S>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    pub fn new(bind_address: SocketAddr, store: Arc<S>) -> Self {
        Self {
            bind_address,
            state: AppState::new(store),
        }
    }

    /// Build the Axum router with all routes
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/api/client", post(add_client::<S>).put(update_client::<S>))
            .route("/api/client/:id", delete(delete_client::<S>))
            .route(
                "/api/algorithms",
                post(update_algorithm_status::<S>).get(list_algorithms::<S>),
            )
            .route("/health", get(health_check::<S>))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves; in-flight requests are drained first
    pub async fn run(&self, shutdown: impl Future<Output = ()> + Send + 'static) -> WebServerResult<()> {
        let router = self.build_router();

        let listener = tokio::net::TcpListener::bind(self.bind_address)
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Failed to bind to {}: {}", self.bind_address, e)))?;
        let local_addr = listener.local_addr()?;

        process_info!(ProcessId::current(), "🌐 CRUD API listening on http://{}", local_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Server error: {e}")))
    }
}
