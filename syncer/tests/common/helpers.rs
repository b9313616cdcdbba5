//! Test doubles for the engine's collaborators
//!
//! `FakeCluster` is an in-memory orchestrator with failure injection and call
//! counters; `SlowReader` is a desired-state reader with a fixed delay.

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use async_trait::async_trait;

use shared::AlgorithmStatus;
use storage::{DesiredStateReader, StorageError, StorageResult};
use syncer::{Deployer, SyncerError, SyncerResult};

#[derive(Default)]
struct ClusterState {
    units: BTreeSet<String>,
    failing_creates: HashSet<String>,
    failing_deletes: HashSet<String>,
    hanging: HashSet<String>,
    list_fails: bool,
}

/// In-memory orchestrator whose create/delete are idempotent
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<ClusterState>,
    op_delay: Duration,
    pub create_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_units(names: &[&str]) -> Self {
        let cluster = Self::new();
        cluster.state.lock().unwrap().units = names.iter().map(|n| n.to_string()).collect();
        cluster
    }

    /// Make every create/delete take this long
    pub fn with_op_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }

    pub fn units(&self) -> BTreeSet<String> {
        self.state.lock().unwrap().units.clone()
    }

    pub fn fail_create(&self, unit: &str) {
        self.state.lock().unwrap().failing_creates.insert(unit.to_string());
    }

    pub fn fail_delete(&self, unit: &str) {
        self.state.lock().unwrap().failing_deletes.insert(unit.to_string());
    }

    /// Calls touching this unit never complete
    pub fn hang_on(&self, unit: &str) {
        self.state.lock().unwrap().hanging.insert(unit.to_string());
    }

    pub fn set_list_fails(&self, fails: bool) {
        self.state.lock().unwrap().list_fails = fails;
    }

    pub fn heal(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_creates.clear();
        state.failing_deletes.clear();
        state.hanging.clear();
        state.list_fails = false;
    }

    pub fn mutation_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst) + self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.mutation_calls() + self.list_calls.load(Ordering::SeqCst)
    }

    /// Highest number of create/delete calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, unit: &str) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let hangs = self.state.lock().unwrap().hanging.contains(unit);
        if hangs {
            std::future::pending::<()>().await;
        }
        if !self.op_delay.is_zero() {
            tokio::time::sleep(self.op_delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Deployer for FakeCluster {
    async fn create_unit(&self, name: &str) -> SyncerResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(name).await;
        let result = {
            let mut state = self.state.lock().unwrap();
            if state.failing_creates.contains(name) {
                Err(SyncerError::CreateFailed {
                    unit: name.to_string(),
                    reason: "admission webhook denied the request".to_string(),
                })
            } else {
                state.units.insert(name.to_string());
                Ok(())
            }
        };
        self.leave();
        result
    }

    async fn delete_unit(&self, name: &str) -> SyncerResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.enter(name).await;
        let result = {
            let mut state = self.state.lock().unwrap();
            if state.failing_deletes.contains(name) {
                Err(SyncerError::DeleteFailed {
                    unit: name.to_string(),
                    reason: "finalizer still pending".to_string(),
                })
            } else {
                state.units.remove(name);
                Ok(())
            }
        };
        self.leave();
        result
    }

    async fn list_units(&self) -> SyncerResult<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.list_fails {
            return Err(SyncerError::orchestrator_unavailable("list refused"));
        }
        Ok(state.units.iter().cloned().collect())
    }
}

/// Reader that takes `delay` per snapshot and records overlapping reads
pub struct SlowReader {
    records: Vec<AlgorithmStatus>,
    delay: Duration,
    pub reads: AtomicUsize,
    read_starts: Mutex<Vec<Instant>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fails: bool,
}

impl SlowReader {
    pub fn new(records: Vec<AlgorithmStatus>, delay: Duration) -> Self {
        Self {
            records,
            delay,
            reads: AtomicUsize::new(0),
            read_starts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fails: false,
        }
    }

    /// Reader that waits `delay` and then reports the store unavailable
    pub fn failing(delay: Duration) -> Self {
        Self {
            fails: true,
            ..Self::new(Vec::new(), delay)
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// When each snapshot read began, in order
    pub fn read_starts(&self) -> Vec<Instant> {
        self.read_starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl DesiredStateReader for SlowReader {
    async fn list_desired_algorithm_states(&self) -> StorageResult<Vec<AlgorithmStatus>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.read_starts.lock().unwrap().push(Instant::now());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fails {
            return Err(StorageError::unavailable("connection refused"));
        }
        Ok(self.records.clone())
    }
}

/// Poll `condition` every 10ms until it holds or `limit` elapses
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
