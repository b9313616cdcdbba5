//! Shared logging utilities for consistent tracing across both binaries

use crate::errors::SharedError;
use crate::types::ProcessId;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::{error, info};

/// Output format of the stdout subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact human readable lines, for local runs
    #[default]
    Text,
    /// One JSON object per event, for deployed environments
    Json,
}

impl FromStr for LogFormat {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "local" => Ok(LogFormat::Text),
            "json" | "dev" | "prod" => Ok(LogFormat::Json),
            _ => Err(SharedError::InvalidConfig {
                field: "log_format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Filter directive scoped to the crates of the current process
pub fn filter_directive(process_id: &ProcessId, base_level: &str) -> String {
    match process_id {
        ProcessId::Syncer => {
            format!("syncer={base_level},storage={base_level},shared={base_level},sqlx=warn,reqwest=warn")
        }
        ProcessId::WebServer => {
            format!("webserver={base_level},storage={base_level},shared={base_level},tower_http={base_level},sqlx=warn")
        }
    }
}

/// Initialize tracing subscriber for the current process
///
/// Uses the global process ID, which must be initialized first.
pub fn init_tracing(log_level: Option<&str>, format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::new(filter_directive(ProcessId::current(), base_level));

    match format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .init();
        }
        LogFormat::Json => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .json()
                .flatten_event(true)
                .init();
        }
    }
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for process-aware info logging
#[macro_export]
macro_rules! process_info {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::info!(
            process = %$process_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for process-aware warning logging
#[macro_export]
macro_rules! process_warn {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::warn!(
            process = %$process_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for process-aware error logging
#[macro_export]
macro_rules! process_error {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::error!(
            process = %$process_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for process-aware debug logging
#[macro_export]
macro_rules! process_debug {
    ($process_id:expr, $($arg:tt)*) => {
        tracing::debug!(
            process = %$process_id,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(process_id: &ProcessId, details: &str) {
    info!(
        process = %process_id,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(process_id: &ProcessId, reason: &str) {
    info!(
        process = %process_id,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(process_id: &ProcessId, context: &str, error: &dyn std::fmt::Display) {
    error!(
        process = %process_id,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(process_id: &ProcessId, message: &str) {
    info!(
        process = %process_id,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_id_display() {
        assert_eq!(ProcessId::Syncer.to_string(), "syncer");
        assert_eq!(ProcessId::WebServer.to_string(), "webserver");
    }

    #[test]
    fn test_filter_directive_scopes_process_crates() {
        let syncer = filter_directive(&ProcessId::Syncer, "debug");
        assert!(syncer.starts_with("syncer=debug"));
        assert!(syncer.contains("storage=debug"));

        let webserver = filter_directive(&ProcessId::WebServer, "info");
        assert!(webserver.starts_with("webserver=info"));
    }

    #[test]
    fn test_log_format_accepts_environment_names() {
        assert_eq!("local".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("prod".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
