//! Service implementations
//!
//! This module contains the real implementations of the `Deployer` trait.

pub mod kubernetes;
pub mod process_deployer;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use kubernetes::{KubernetesConfig, KubernetesDeployer};
pub use process_deployer::LocalProcessDeployer;
