//! Durable store for client records and algorithm flags
//!
//! The syncer only reads through [`DesiredStateReader`]; the CRUD webserver
//! writes through [`ClientStore`]. Both are implemented by the PostgreSQL
//! store and by an in-memory store used for tests and local runs.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use postgres::{PgStore, PgStoreConfig};
pub use traits::{ClientStore, DesiredStateReader, MockClientStore, MockDesiredStateReader};
