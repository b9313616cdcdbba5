//! Shared types for the algorithm fleet syncer
//!
//! Contains the domain model that both the syncer and the CRUD webserver
//! agree on, the process identity used for logging, and small config helpers.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use config::parse_duration;
pub use errors::*;
pub use types::*;
