//! CRUD API for clients and their algorithm flags
//!
//! Writes go to the same store the syncer reads its desired state from; the
//! syncer picks changes up on its next pass.

pub mod error;
pub mod state;
pub mod web;
pub mod webserver_impl;

// Re-export main types
pub use error::{WebServerError, WebServerResult};
pub use state::AppState;
pub use web::handlers::api::ClientUpdate;
pub use webserver_impl::WebServer;
