//! Common test utilities and infrastructure
//!
//! This module provides shared fixtures and test doubles used across the
//! syncer test suites.

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

// Re-export commonly used items for convenience
pub use fixtures::TestFixtures;
pub use helpers::{wait_until, FakeCluster, SlowReader};
