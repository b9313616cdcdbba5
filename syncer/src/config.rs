//! Reconciliation engine configuration

use std::time::Duration;

use shared::UnitPrefixes;

use crate::error::{SyncerError, SyncerResult};

/// Options controlling cadence and fan-out of reconciliation passes
#[derive(Debug, Clone)]
pub struct SyncerConfig {
    /// Fixed interval between pass starts
    pub reconcile_interval: Duration,
    /// Bound on every store and orchestrator call made during a pass
    pub call_timeout: Duration,
    /// Upper bound on unit operations in flight within one pass
    pub max_concurrent_operations: usize,
    /// List live units first and skip create/delete calls that would be no-ops
    pub prune_with_listing: bool,
    pub unit_prefixes: UnitPrefixes,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(300),
            call_timeout: Duration::from_secs(10),
            max_concurrent_operations: 4,
            prune_with_listing: true,
            unit_prefixes: UnitPrefixes::default(),
        }
    }
}

impl SyncerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = max;
        self
    }

    pub fn with_listing(mut self, prune_with_listing: bool) -> Self {
        self.prune_with_listing = prune_with_listing;
        self
    }

    pub fn with_unit_prefixes(mut self, prefixes: UnitPrefixes) -> Self {
        self.unit_prefixes = prefixes;
        self
    }

    pub fn validate(&self) -> SyncerResult<()> {
        if self.reconcile_interval.is_zero() {
            return Err(SyncerError::config("reconcile_interval must be greater than zero"));
        }
        if self.call_timeout.is_zero() {
            return Err(SyncerError::config("call_timeout must be greater than zero"));
        }
        if self.max_concurrent_operations == 0 {
            return Err(SyncerError::config("max_concurrent_operations must be at least 1"));
        }

        let prefixes = &self.unit_prefixes;
        let all = [&prefixes.vwap, &prefixes.twap, &prefixes.hft];
        if all.iter().any(|p| p.is_empty()) {
            return Err(SyncerError::config("unit prefixes must not be empty"));
        }
        if prefixes.vwap == prefixes.twap || prefixes.vwap == prefixes.hft || prefixes.twap == prefixes.hft {
            return Err(SyncerError::config("unit prefixes must be distinct"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SyncerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reconcile_interval, Duration::from_secs(300));
        assert_eq!(config.unit_prefixes.vwap, "vmap");
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(SyncerConfig::default().with_interval(Duration::ZERO).validate().is_err());
        assert!(SyncerConfig::default().with_call_timeout(Duration::ZERO).validate().is_err());
        assert!(SyncerConfig::default().with_max_concurrent_operations(0).validate().is_err());
    }

    #[test]
    fn test_colliding_prefixes_rejected() {
        let prefixes = UnitPrefixes {
            vwap: "algo".to_string(),
            twap: "algo".to_string(),
            hft: "hft".to_string(),
        };
        let result = SyncerConfig::default().with_unit_prefixes(prefixes).validate();
        assert!(matches!(result, Err(SyncerError::Configuration { .. })));
    }
}
