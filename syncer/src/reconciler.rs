//! Reconciliation engine
//!
//! Each pass re-reads the full desired-state snapshot, derives one unit per
//! `(algorithm record, kind)` pair and issues idempotent create/delete calls
//! until the orchestrator matches. Failures are isolated per unit: only a
//! failed snapshot read aborts a pass, and the next tick retries everything.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use shared::{process_debug, process_error, process_info, process_warn, AlgorithmKind, AlgorithmStatus, ProcessId};
use storage::DesiredStateReader;

use crate::config::SyncerConfig;
use crate::error::{SyncerError, SyncerResult};
use crate::traits::Deployer;

const IDLE: u8 = 0;
const RECONCILING: u8 = 1;

/// Scheduler state; `Idle` between passes, `Reconciling` during one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    Reconciling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitAction {
    Create,
    Delete,
}

impl fmt::Display for UnitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitAction::Create => write!(f, "create"),
            UnitAction::Delete => write!(f, "delete"),
        }
    }
}

/// One converging operation derived from desired state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOperation {
    pub unit: String,
    pub kind: AlgorithmKind,
    pub algorithm_id: i64,
    pub action: UnitAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: String,
    pub action: UnitAction,
    pub error: String,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Algorithm records in the snapshot
    pub records: usize,
    pub created: usize,
    pub deleted: usize,
    /// Operations skipped because the live listing showed them to be no-ops
    pub skipped: usize,
    pub failures: Vec<UnitFailure>,
}

impl PassReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Orchestrator mutations issued, successful or not
    pub fn attempted(&self) -> usize {
        self.created + self.deleted + self.failures.len()
    }
}

/// Derive the full operation list for a snapshot, three operations per record
pub fn plan_operations(snapshot: &[AlgorithmStatus], config: &SyncerConfig) -> Vec<UnitOperation> {
    snapshot
        .iter()
        .flat_map(|record| {
            AlgorithmKind::ALL.into_iter().map(move |kind| UnitOperation {
                unit: config.unit_prefixes.unit_name(kind, record.algorithm_id),
                kind,
                algorithm_id: record.algorithm_id,
                action: if record.is_enabled(kind) {
                    UnitAction::Create
                } else {
                    UnitAction::Delete
                },
            })
        })
        .collect()
}

/// A planned operation is a no-op when the listing already shows the target state
fn is_noop(op: &UnitOperation, live: &HashSet<String>) -> bool {
    match op.action {
        UnitAction::Create => live.contains(&op.unit),
        UnitAction::Delete => !live.contains(&op.unit),
    }
}

/// Issue one operation under the call timeout
async fn apply<D: Deployer>(deployer: Arc<D>, call_timeout: Duration, op: UnitOperation) -> (UnitOperation, SyncerResult<()>) {
    let result = match op.action {
        UnitAction::Create => bounded(call_timeout, "create unit", deployer.create_unit(&op.unit)).await,
        UnitAction::Delete => bounded(call_timeout, "delete unit", deployer.delete_unit(&op.unit)).await,
    };
    if result.is_ok() {
        process_debug!(
            ProcessId::current(),
            "🔧 {} {} ({} for algorithm {})",
            op.action,
            op.unit,
            op.kind,
            op.algorithm_id
        );
    }
    (op, result)
}

/// First tick strictly after `now` on the grid `scheduled + k * period`
///
/// Ticks that fell inside a pass are dropped rather than delivered late.
fn next_tick_after(scheduled: Instant, period: Duration, now: Instant) -> Instant {
    let elapsed = now.saturating_duration_since(scheduled);
    let periods = elapsed.as_nanos() / period.as_nanos().max(1) + 1;
    scheduled + period * u32::try_from(periods).unwrap_or(u32::MAX)
}

/// Bound one orchestrator call; a hung call surfaces as `OrchestratorUnavailable`
async fn bounded<T>(call_timeout: Duration, what: &str, fut: impl Future<Output = SyncerResult<T>>) -> SyncerResult<T> {
    tokio::time::timeout(call_timeout, fut).await.unwrap_or_else(|_| {
        Err(SyncerError::orchestrator_unavailable(format!(
            "{what} timed out after {call_timeout:?}"
        )))
    })
}

pub struct Reconciler<R, D>
where
    R: DesiredStateReader + 'static,
    D: Deployer + 'static,
{
    reader: Arc<R>,
    deployer: Arc<D>,
    config: SyncerConfig,
}

impl<R, D> Reconciler<R, D>
where
    R: DesiredStateReader + 'static,
    D: Deployer + 'static,
{
    /// Create new reconciler with injected collaborators
    pub fn new(reader: R, deployer: D, config: SyncerConfig) -> Self {
        Self::from_shared(Arc::new(reader), Arc::new(deployer), config)
    }

    /// Create a reconciler over collaborators the caller keeps handles to
    pub fn from_shared(reader: Arc<R>, deployer: Arc<D>, config: SyncerConfig) -> Self {
        Self {
            reader,
            deployer,
            config,
        }
    }

    /// Run exactly one full reconciliation pass
    ///
    /// # Returns
    /// A report of every operation issued. `StoreUnavailable` when the
    /// snapshot could not be read, in which case no orchestrator call was made.
    pub async fn run_pass(&self) -> SyncerResult<PassReport> {
        let snapshot = match tokio::time::timeout(
            self.config.call_timeout,
            self.reader.list_desired_algorithm_states(),
        )
        .await
        {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                let err = SyncerError::from(e);
                process_error!(ProcessId::current(), "❌ Error fetching desired state: {}", err);
                return Err(err);
            }
            Err(_) => {
                let err = SyncerError::store_unavailable(format!(
                    "desired state read timed out after {:?}",
                    self.config.call_timeout
                ));
                process_error!(ProcessId::current(), "❌ Error fetching desired state: {}", err);
                return Err(err);
            }
        };

        let mut report = PassReport {
            records: snapshot.len(),
            ..PassReport::default()
        };
        if snapshot.is_empty() {
            process_debug!(ProcessId::current(), "📭 Desired state is empty, nothing to reconcile");
            return Ok(report);
        }

        let live = if self.config.prune_with_listing {
            self.live_units().await
        } else {
            None
        };

        let mut operations = plan_operations(&snapshot, &self.config);
        if let Some(live) = &live {
            let before = operations.len();
            operations.retain(|op| !is_noop(op, live));
            report.skipped = before - operations.len();
        }

        let deployer = Arc::clone(&self.deployer);
        let call_timeout = self.config.call_timeout;
        let outcomes: Vec<(UnitOperation, SyncerResult<()>)> = stream::iter(operations)
            .map(move |op| apply(Arc::clone(&deployer), call_timeout, op))
            .buffer_unordered(self.config.max_concurrent_operations)
            .collect()
            .await;

        for (op, outcome) in outcomes {
            match outcome {
                Ok(()) => match op.action {
                    UnitAction::Create => report.created += 1,
                    UnitAction::Delete => report.deleted += 1,
                },
                Err(e) => {
                    process_error!(ProcessId::current(), "❌ Error {} unit {}: {}", op.action, op.unit, e);
                    report.failures.push(UnitFailure {
                        unit: op.unit,
                        action: op.action,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Current unit set, or `None` when listing fails and every operation must be issued
    async fn live_units(&self) -> Option<HashSet<String>> {
        match bounded(self.config.call_timeout, "list units", self.deployer.list_units()).await {
            Ok(units) => Some(units.into_iter().collect()),
            Err(e) => {
                process_warn!(
                    ProcessId::current(),
                    "⚠️ Could not list units, issuing every operation: {}",
                    e
                );
                None
            }
        }
    }

    /// Spawn the fixed-interval background task
    ///
    /// The first pass starts immediately. Ticks that fire while a pass is
    /// still running are dropped, so passes never overlap and the next pass
    /// waits for the next tick on the original grid.
    ///
    /// # Returns
    /// `Configuration` when the config does not validate; no task is spawned.
    pub fn start(self) -> SyncerResult<ReconcilerHandle> {
        self.config.validate()?;

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let state = Arc::new(AtomicU8::new(IDLE));
        let passes = Arc::new(AtomicU64::new(0));

        let task_state = Arc::clone(&state);
        let task_passes = Arc::clone(&passes);
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.config.reconcile_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            process_info!(
                ProcessId::current(),
                "⏱️ Reconciler started, interval {:?}",
                self.config.reconcile_interval
            );

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    scheduled = ticker.tick() => {
                        task_state.store(RECONCILING, Ordering::SeqCst);
                        match self.run_pass().await {
                            Ok(report) if report.is_clean() => {
                                process_info!(
                                    ProcessId::current(),
                                    "✅ Pass complete: {} records, {} created, {} deleted, {} skipped",
                                    report.records, report.created, report.deleted, report.skipped
                                );
                            }
                            Ok(report) => {
                                process_warn!(
                                    ProcessId::current(),
                                    "⚠️ Pass complete with {} failures: {} records, {} created, {} deleted, {} skipped",
                                    report.failures.len(), report.records, report.created, report.deleted, report.skipped
                                );
                            }
                            Err(e) => {
                                process_warn!(ProcessId::current(), "⚠️ Pass aborted, retrying next tick: {}", e);
                            }
                        }
                        // Skip alone would still deliver a tick missed during the pass
                        let period = self.config.reconcile_interval;
                        if scheduled.elapsed() >= period {
                            ticker.reset_at(next_tick_after(scheduled, period, Instant::now()));
                        }
                        task_state.store(IDLE, Ordering::SeqCst);
                        task_passes.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }

            process_info!(ProcessId::current(), "🛑 Reconciler stopped");
        });

        Ok(ReconcilerHandle {
            shutdown_tx,
            task,
            state,
            passes,
        })
    }
}

/// Control handle for a running reconciler task
pub struct ReconcilerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    state: Arc<AtomicU8>,
    passes: Arc<AtomicU64>,
}

impl ReconcilerHandle {
    pub fn state(&self) -> ReconcilerState {
        match self.state.load(Ordering::SeqCst) {
            RECONCILING => ReconcilerState::Reconciling,
            _ => ReconcilerState::Idle,
        }
    }

    /// Passes finished so far, including aborted ones
    pub fn passes_completed(&self) -> u64 {
        self.passes.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the task and wait for it to exit; a pass in progress finishes first
    pub async fn stop(self) -> SyncerResult<()> {
        let _ = self.shutdown_tx.send(true);
        self.task
            .await
            .map_err(|e| SyncerError::TaskFailed { message: e.to_string() })
    }
}
