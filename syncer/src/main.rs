//! Main entry point for the syncer binary
//!
//! Wires the PostgreSQL store and the selected deployer into the reconciler
//! and runs it until Ctrl+C.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::signal;

use shared::logging::{self, LogFormat};
use shared::{parse_duration, process_debug, process_info, process_warn, ProcessId, UnitPrefixes};
use storage::{PgStore, PgStoreConfig};
use syncer::{
    Deployer, KubernetesConfig, KubernetesDeployer, LocalProcessDeployer, Reconciler, SyncerConfig, SyncerError,
    SyncerResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeployerKind {
    /// Pods in a Kubernetes namespace
    Kubernetes,
    /// Child processes on this host
    Process,
}

/// Keeps algorithm units on the orchestrator in line with client flags in the database
#[derive(Parser, Debug)]
#[command(name = "syncer")]
#[command(about = "Reconciles running algorithm units with desired state in PostgreSQL")]
struct Args {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Interval between reconciliation passes (e.g. 300s, 5m)
    #[arg(long, env = "SYNC_INTERVAL", default_value = "300s", value_parser = parse_interval)]
    sync_interval: Duration,

    /// Bound on each store and orchestrator call
    #[arg(long, env = "SYNC_CALL_TIMEOUT", default_value = "10s", value_parser = parse_interval)]
    call_timeout: Duration,

    /// Unit operations in flight per pass
    #[arg(long, env = "SYNC_CONCURRENCY", default_value = "4")]
    concurrency: usize,

    /// Issue every create/delete instead of skipping those the live listing shows as no-ops
    #[arg(long, env = "SYNC_NO_LISTING")]
    no_listing: bool,

    /// Unit name prefix for VWAP units
    #[arg(long, env = "VWAP_PREFIX", default_value = "vmap")]
    vwap_prefix: String,

    /// Unit name prefix for TWAP units
    #[arg(long, env = "TWAP_PREFIX", default_value = "twap")]
    twap_prefix: String,

    /// Unit name prefix for HFT units
    #[arg(long, env = "HFT_PREFIX", default_value = "hft")]
    hft_prefix: String,

    /// Orchestrator backend
    #[arg(long, env = "SYNC_DEPLOYER", value_enum, default_value = "kubernetes")]
    deployer: DeployerKind,

    /// Read API server address and credentials from the pod's service account
    #[arg(long, env = "KUBE_IN_CLUSTER")]
    in_cluster: bool,

    /// Kubernetes API server URL when not running in-cluster
    #[arg(long, env = "KUBE_API_URL", default_value = "http://127.0.0.1:8001")]
    kube_api_url: String,

    /// Bearer token for the API server
    #[arg(long, env = "KUBE_TOKEN")]
    kube_token: Option<String>,

    /// Namespace holding algorithm pods
    #[arg(long, env = "KUBE_NAMESPACE")]
    kube_namespace: Option<String>,

    /// Container image run by each pod
    #[arg(long, env = "ALGORITHM_IMAGE", default_value = "algorithm-image")]
    image: String,

    /// Program started per unit by the process deployer; `{unit}` in args is replaced by the unit name
    #[arg(long, env = "UNIT_PROGRAM", default_value = "algorithm")]
    unit_program: String,

    /// Arguments passed to the unit program
    #[arg(long = "unit-arg", env = "UNIT_ARGS", value_delimiter = ' ')]
    unit_args: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

fn parse_interval(value: &str) -> Result<Duration, String> {
    parse_duration(value).map_err(|e| e.to_string())
}

impl Args {
    fn syncer_config(&self) -> SyncerConfig {
        SyncerConfig::default()
            .with_interval(self.sync_interval)
            .with_call_timeout(self.call_timeout)
            .with_max_concurrent_operations(self.concurrency)
            .with_listing(!self.no_listing)
            .with_unit_prefixes(UnitPrefixes {
                vwap: self.vwap_prefix.clone(),
                twap: self.twap_prefix.clone(),
                hft: self.hft_prefix.clone(),
            })
    }

    fn kubernetes_config(&self) -> SyncerResult<KubernetesConfig> {
        let mut config = if self.in_cluster {
            KubernetesConfig::from_in_cluster()?
        } else {
            KubernetesConfig::new(self.kube_api_url.clone()).with_token(self.kube_token.clone())
        };
        if let Some(namespace) = &self.kube_namespace {
            config = config.with_namespace(namespace.clone());
        }
        Ok(config
            .with_image(self.image.clone())
            .with_request_timeout(self.call_timeout))
    }
}

/// Run the reconciler until Ctrl+C, then wait for the current pass to finish
async fn run_until_shutdown<D: Deployer + 'static>(
    store: Arc<PgStore>,
    deployer: Arc<D>,
    config: SyncerConfig,
) -> SyncerResult<()> {
    let handle = Reconciler::from_shared(store, deployer, config).start()?;

    match signal::ctrl_c().await {
        Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
        Err(err) => logging::log_error(ProcessId::current(), "Signal handling", &err),
    }

    if handle.is_finished() {
        process_warn!(ProcessId::current(), "⚠️ Reconciler task exited before shutdown was requested");
    }

    process_debug!(
        ProcessId::current(),
        "📊 {} passes completed, stopping in state {:?}",
        handle.passes_completed(),
        handle.state()
    );
    handle.stop().await
}

#[tokio::main]
async fn main() -> SyncerResult<()> {
    // Values in .env fill in for unset environment variables
    dotenv::dotenv().ok();
    let args = Args::parse();

    ProcessId::init_syncer();
    logging::init_tracing(Some(&args.log_level), args.log_format);
    logging::log_startup(ProcessId::current(), "algorithm fleet syncer");

    let config = args.syncer_config();
    config.validate()?;

    let store = PgStore::connect(&PgStoreConfig::new(args.database_url.clone()).with_query_timeout(args.call_timeout))
        .await
        .map_err(|e| {
            logging::log_error(ProcessId::current(), "Database connection", &e);
            SyncerError::from(e)
        })?;
    process_info!(ProcessId::current(), "🗄️ Connected to desired state store");
    let store = Arc::new(store);

    match args.deployer {
        DeployerKind::Kubernetes => {
            let kube_config = args.kubernetes_config()?;
            process_info!(
                ProcessId::current(),
                "☸️ Deploying pods to {} (namespace {})",
                kube_config.api_url,
                kube_config.namespace
            );
            let deployer = Arc::new(KubernetesDeployer::new(kube_config)?);
            run_until_shutdown(store, deployer, config).await?;
        }
        DeployerKind::Process => {
            process_info!(ProcessId::current(), "🏭 Deploying units as local processes of {}", args.unit_program);
            let deployer = Arc::new(LocalProcessDeployer::new(args.unit_program.clone()).with_args(args.unit_args.clone()));
            run_until_shutdown(store, Arc::clone(&deployer), config).await?;
            deployer.stop_all().await?;
        }
    }

    logging::log_success(ProcessId::current(), "Syncer stopped gracefully");
    Ok(())
}
