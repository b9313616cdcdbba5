//! Trait definitions with mockall annotations for testing
//!
//! The orchestrator client is a capability set over whatever runs the
//! algorithm units. The reconciler only talks to this trait, so tests can swap
//! in mocks or an in-memory cluster.

use crate::error::SyncerResult;

/// Orchestrator abstraction managing presence/absence of named units
///
/// Every operation must be idempotent: the reconciler keeps no record of
/// actual state and repeats calls on every pass.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Deployer: Send + Sync {
    /// Ensure a unit with this name exists
    ///
    /// # Returns
    /// `Ok(())` when the unit was created or was already present.
    /// `OrchestratorUnavailable` on transport/auth failure, `CreateFailed`
    /// when the orchestrator rejects the request.
    async fn create_unit(&self, name: &str) -> SyncerResult<()>;

    /// Ensure no unit with this name exists
    ///
    /// # Returns
    /// `Ok(())` when the unit was deleted or was already absent.
    /// `OrchestratorUnavailable` or `DeleteFailed` otherwise.
    async fn delete_unit(&self, name: &str) -> SyncerResult<()>;

    /// Names of every unit in the managed namespace/pool
    async fn list_units(&self) -> SyncerResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_deployer_instantiation() {
        let mut deployer = MockDeployer::new();
        deployer.expect_list_units().returning(|| Ok(vec!["vmap-1".to_string()]));

        assert_eq!(deployer.list_units().await.unwrap(), vec!["vmap-1".to_string()]);
    }
}
