//! Test helper utilities for webserver integration tests

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use shared::{AlgorithmFlags, AlgorithmStatus, Client, NewClient};
use storage::{ClientStore, DesiredStateReader, MemoryStore, StorageResult};
use webserver::WebServer;

// Store double implementing both store traits, for failure paths
mockall::mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl ClientStore for Store {
        async fn add_client(&self, client: NewClient) -> StorageResult<Client>;
        async fn update_client(&self, client: Client) -> StorageResult<Client>;
        async fn delete_client(&self, client_id: i64) -> StorageResult<()>;
        async fn update_algorithm_status(&self, flags: AlgorithmFlags) -> StorageResult<AlgorithmStatus>;
        async fn get_client(&self, client_id: i64) -> StorageResult<Option<Client>>;
    }

    #[async_trait::async_trait]
    impl DesiredStateReader for Store {
        async fn list_desired_algorithm_states(&self) -> StorageResult<Vec<AlgorithmStatus>>;
    }
}

fn test_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 0))
}

pub fn router_for<S>(store: Arc<S>) -> Router
where
    S: ClientStore + DesiredStateReader + 'static,
{
    WebServer::new(test_address(), store).build_router()
}

/// Router over a fresh in-memory store, with a handle to inspect the store
pub fn memory_router() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    (Arc::clone(&store), router_for(store))
}

pub fn json_request(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn raw_request(method: Method, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

/// Send one request through the router; the body is parsed as JSON when possible
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
