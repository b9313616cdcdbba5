//! Test fixtures for syncer tests
//!
//! Canned algorithm records and engine configurations.

use std::collections::BTreeSet;
use std::time::Duration;

use shared::AlgorithmStatus;
use syncer::SyncerConfig;

pub struct TestFixtures;

impl TestFixtures {
    /// Short bound so hung-call tests finish quickly
    pub const CALL_TIMEOUT: Duration = Duration::from_millis(200);

    pub fn record(algorithm_id: i64, vwap: bool, twap: bool, hft: bool) -> AlgorithmStatus {
        AlgorithmStatus {
            algorithm_id,
            client_id: algorithm_id,
            vwap,
            twap,
            hft,
        }
    }

    /// Client 1 running VWAP and HFT but not TWAP
    pub fn vwap_and_hft() -> AlgorithmStatus {
        Self::record(1, true, false, true)
    }

    /// Records 1..=count with every flag on
    pub fn all_enabled(count: i64) -> Vec<AlgorithmStatus> {
        (1..=count).map(|id| Self::record(id, true, true, true)).collect()
    }

    /// Engine config for direct `run_pass` calls
    pub fn config() -> SyncerConfig {
        SyncerConfig::default().with_call_timeout(Self::CALL_TIMEOUT)
    }

    /// Engine config that issues every planned operation
    pub fn config_without_listing() -> SyncerConfig {
        Self::config().with_listing(false)
    }

    /// Engine config for scheduler tests
    pub fn scheduled_config(interval: Duration) -> SyncerConfig {
        Self::config().with_interval(interval)
    }

    pub fn units(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }
}
