//! Capability traits over the durable store, with mockall annotations for testing
//!
//! The reconciliation engine depends only on [`DesiredStateReader`], so a
//! test double can stand in for the database without touching the engine.

use shared::{AlgorithmFlags, AlgorithmStatus, Client, NewClient};

use crate::error::StorageResult;

/// Read-only view of the desired algorithm state
#[mockall::automock]
#[async_trait::async_trait]
pub trait DesiredStateReader: Send + Sync {
    /// Full snapshot of every algorithm record.
    ///
    /// # Returns
    /// Every record currently stored, or an empty vector when there are none.
    /// Connectivity loss is reported as `StorageError::Unavailable`.
    async fn list_desired_algorithm_states(&self) -> StorageResult<Vec<AlgorithmStatus>>;
}

/// Client and flag mutations performed by the CRUD API
#[mockall::automock]
#[async_trait::async_trait]
pub trait ClientStore: Send + Sync {
    /// Insert a client together with an algorithm record that has every flag off
    ///
    /// # Returns
    /// The stored client with its assigned id, or `ClientConflict` when the
    /// name is taken.
    async fn add_client(&self, client: NewClient) -> StorageResult<Client>;

    /// Overwrite every mutable column of an existing client
    async fn update_client(&self, client: Client) -> StorageResult<Client>;

    /// Remove a client and its algorithm records
    async fn delete_client(&self, client_id: i64) -> StorageResult<()>;

    /// Replace the flags of the algorithm record owned by `flags.client_id`
    async fn update_algorithm_status(&self, flags: AlgorithmFlags) -> StorageResult<AlgorithmStatus>;

    async fn get_client(&self, client_id: i64) -> StorageResult<Option<Client>>;
}
