//! Request handlers

pub mod api;

pub use api::{add_client, delete_client, health_check, list_algorithms, update_algorithm_status, update_client};
