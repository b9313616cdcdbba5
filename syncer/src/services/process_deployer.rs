//! Local process deployer
//!
//! Runs each unit as a child process of the syncer. Useful on a single host
//! and in development, where no cluster is available. Children that exited on
//! their own are reaped and count as absent.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use shared::{process_debug, process_warn, ProcessId};

use crate::error::{SyncerError, SyncerResult};
use crate::traits::Deployer;

/// Placeholder in arguments replaced by the unit name
const UNIT_PLACEHOLDER: &str = "{unit}";

/// Handle for a managed unit process
struct UnitProcess {
    child: Child,
    pid: u32,
    started_at: Instant,
}

/// Deployer that spawns one local process per unit
pub struct LocalProcessDeployer {
    program: String,
    args: Vec<String>,
    /// How long a unit gets to exit after SIGTERM before it is killed
    grace_period: Duration,
    units: Mutex<HashMap<String, UnitProcess>>,
}

impl LocalProcessDeployer {
    /// Create new deployer running `program` for every unit
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            grace_period: Duration::from_secs(5),
            units: Mutex::new(HashMap::new()),
        }
    }

    /// Configure arguments (fluent API); `{unit}` is replaced by the unit name
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Configure termination grace period (fluent API)
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    fn spawn_unit(&self, name: &str) -> SyncerResult<UnitProcess> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(|arg| arg.replace(UNIT_PLACEHOLDER, name)))
            .env("UNIT_NAME", name)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| SyncerError::CreateFailed {
            unit: name.to_string(),
            reason: format!("failed to spawn {}: {e}", self.program),
        })?;
        let pid = child.id().unwrap_or(0);

        Ok(UnitProcess {
            child,
            pid,
            started_at: Instant::now(),
        })
    }

    /// Check if a process is still running
    fn is_running(child: &mut Child) -> bool {
        matches!(child.try_wait(), Ok(None))
    }

    async fn terminate(&self, name: &str, mut unit: UnitProcess) -> SyncerResult<()> {
        if !Self::is_running(&mut unit.child) {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            // pid 0 would signal our own process group
            if let Some(pid) = i32::try_from(unit.pid).ok().filter(|pid| *pid > 0) {
                if signal::kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(self.grace_period, unit.child.wait()).await.is_ok()
                {
                    return Ok(());
                }
            }
        }

        unit.child.kill().await.map_err(|e| SyncerError::DeleteFailed {
            unit: name.to_string(),
            reason: format!("failed to kill pid {}: {e}", unit.pid),
        })
    }

    /// Terminate every unit, used on shutdown
    pub async fn stop_all(&self) -> SyncerResult<()> {
        let drained: Vec<(String, UnitProcess)> = self.units.lock().await.drain().collect();
        for (name, unit) in drained {
            if let Err(e) = self.terminate(&name, unit).await {
                process_warn!(ProcessId::current(), "⚠️ Failed to stop unit {}: {}", name, e);
            }
        }
        process_debug!(ProcessId::current(), "🛑 All units stopped");
        Ok(())
    }
}

#[async_trait]
impl Deployer for LocalProcessDeployer {
    async fn create_unit(&self, name: &str) -> SyncerResult<()> {
        let mut units = self.units.lock().await;

        if let Some(existing) = units.get_mut(name) {
            if Self::is_running(&mut existing.child) {
                return Ok(());
            }
            process_warn!(
                ProcessId::current(),
                "⚠️ Unit {} (PID: {}) exited after {:?}, respawning",
                name,
                existing.pid,
                existing.started_at.elapsed()
            );
        }

        let unit = self.spawn_unit(name)?;
        process_debug!(ProcessId::current(), "🏭 Spawned unit {} (PID: {})", name, unit.pid);
        units.insert(name.to_string(), unit);
        Ok(())
    }

    async fn delete_unit(&self, name: &str) -> SyncerResult<()> {
        let removed = self.units.lock().await.remove(name);
        if let Some(unit) = removed {
            self.terminate(name, unit).await?;
            process_debug!(ProcessId::current(), "🛑 Stopped unit {}", name);
        }
        Ok(())
    }

    async fn list_units(&self) -> SyncerResult<Vec<String>> {
        let mut units = self.units.lock().await;
        units.retain(|_, unit| Self::is_running(&mut unit.child));

        let mut names: Vec<String> = units.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
