//! WebServer entry point
//!
//! Serves the CRUD API over PostgreSQL, or over an in-memory store for local
//! runs without a database.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::signal;

use shared::logging::{self, LogFormat};
use shared::{process_info, ProcessId};
use storage::{ClientStore, DesiredStateReader, MemoryStore, PgStore, PgStoreConfig};
use webserver::{WebServer, WebServerError, WebServerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    Postgres,
    /// Volatile store, lost on exit
    Memory,
}

/// CRUD API for algorithm clients
#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "HTTP API for managing clients and their algorithm flags")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "127.0.0.1:8080")]
    listen_addr: SocketAddr,

    /// Backing store
    #[arg(long, env = "STORE", value_enum, default_value = "postgres")]
    store: StoreKind,

    /// PostgreSQL connection URL (required with --store postgres)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => logging::log_shutdown(ProcessId::current(), "Received Ctrl+C signal"),
        Err(err) => logging::log_error(ProcessId::current(), "Signal handling", &err),
    }
}

async fn serve<S>(listen_addr: SocketAddr, store: Arc<S>) -> WebServerResult<()>
where
    S: ClientStore + DesiredStateReader + 'static,
{
    WebServer::new(listen_addr, store).run(shutdown_signal()).await
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    ProcessId::init_webserver();
    logging::init_tracing(Some(&args.log_level), args.log_format);
    logging::log_startup(ProcessId::current(), "CRUD API");

    match args.store {
        StoreKind::Postgres => {
            let url = args
                .database_url
                .clone()
                .ok_or_else(|| WebServerError::ServerStartup("DATABASE_URL is required for the postgres store".to_string()))?;
            let store = PgStore::connect(&PgStoreConfig::new(url)).await.map_err(|e| {
                logging::log_error(ProcessId::current(), "Database connection", &e);
                WebServerError::ServerStartup(format!("cannot connect to store: {e}"))
            })?;
            process_info!(ProcessId::current(), "🗄️ Connected to PostgreSQL store");
            serve(args.listen_addr, Arc::new(store)).await?;
        }
        StoreKind::Memory => {
            process_info!(ProcessId::current(), "🧪 Using in-memory store; data is lost on exit");
            serve(args.listen_addr, Arc::new(MemoryStore::new())).await?;
        }
    }

    logging::log_success(ProcessId::current(), "WebServer stopped gracefully");
    Ok(())
}
