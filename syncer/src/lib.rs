//! Algorithm fleet syncer
//!
//! Periodically converges the set of running algorithm units on an
//! orchestrator with the per-client algorithm flags held in the store.
//! The engine only depends on the [`Deployer`] and
//! [`storage::DesiredStateReader`] traits, so both sides can be swapped for
//! mocks in tests.

pub mod config;
pub mod error;
pub mod reconciler;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::SyncerConfig;
pub use error::{SyncerError, SyncerResult};
pub use reconciler::{
    plan_operations, PassReport, Reconciler, ReconcilerHandle, ReconcilerState, UnitAction, UnitFailure,
    UnitOperation,
};
pub use services::{KubernetesConfig, KubernetesDeployer, LocalProcessDeployer};
pub use traits::{Deployer, MockDeployer};
