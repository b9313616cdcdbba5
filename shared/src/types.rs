//! Core domain types and identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::errors::SharedError;

/// Global process ID singleton - set once at startup
static PROCESS_ID: OnceLock<ProcessId> = OnceLock::new();

/// Process identifier for any binary in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessId {
    /// Reconciliation engine process
    Syncer,
    /// CRUD API process
    WebServer,
}

impl ProcessId {
    /// Initialize the global process ID for the syncer
    pub fn init_syncer() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::Syncer)
    }

    /// Initialize the global process ID for the webserver
    pub fn init_webserver() -> &'static ProcessId {
        PROCESS_ID.get_or_init(|| ProcessId::WebServer)
    }

    /// Get the global process ID.
    ///
    /// Library code may log before a binary has called `init_*` (tests do),
    /// so an uninitialized id reads as the syncer.
    pub fn current() -> &'static ProcessId {
        PROCESS_ID.get().unwrap_or(&ProcessId::Syncer)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessId::Syncer => write!(f, "syncer"),
            ProcessId::WebServer => write!(f, "webserver"),
        }
    }
}

/// Trading algorithm kinds a client can switch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    Vwap,
    Twap,
    Hft,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 3] = [AlgorithmKind::Vwap, AlgorithmKind::Twap, AlgorithmKind::Hft];
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmKind::Vwap => write!(f, "vwap"),
            AlgorithmKind::Twap => write!(f, "twap"),
            AlgorithmKind::Hft => write!(f, "hft"),
        }
    }
}

impl FromStr for AlgorithmKind {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vwap" => Ok(AlgorithmKind::Vwap),
            "twap" => Ok(AlgorithmKind::Twap),
            "hft" => Ok(AlgorithmKind::Hft),
            _ => Err(SharedError::UnknownAlgorithmKind { input: s.to_string() }),
        }
    }
}

/// Desired activation flags for one client's algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmStatus {
    pub algorithm_id: i64,
    pub client_id: i64,
    pub vwap: bool,
    pub twap: bool,
    pub hft: bool,
}

impl AlgorithmStatus {
    /// Record with every algorithm switched off, the state a new client starts in
    pub fn disabled(algorithm_id: i64, client_id: i64) -> Self {
        Self {
            algorithm_id,
            client_id,
            vwap: false,
            twap: false,
            hft: false,
        }
    }

    pub fn is_enabled(&self, kind: AlgorithmKind) -> bool {
        match kind {
            AlgorithmKind::Vwap => self.vwap,
            AlgorithmKind::Twap => self.twap,
            AlgorithmKind::Hft => self.hft,
        }
    }

    pub fn set_enabled(&mut self, kind: AlgorithmKind, enabled: bool) {
        match kind {
            AlgorithmKind::Vwap => self.vwap = enabled,
            AlgorithmKind::Twap => self.twap = enabled,
            AlgorithmKind::Hft => self.hft = enabled,
        }
    }
}

/// Flag update addressed by owning client, as submitted through the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmFlags {
    pub client_id: i64,
    #[serde(default)]
    pub vwap: bool,
    #[serde(default)]
    pub twap: bool,
    #[serde(default)]
    pub hft: bool,
}

/// Unit name prefix per algorithm kind.
///
/// Units already running in clusters were named `vmap-*` for VWAP, so the
/// defaults keep that spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrefixes {
    pub vwap: String,
    pub twap: String,
    pub hft: String,
}

impl Default for UnitPrefixes {
    fn default() -> Self {
        Self {
            vwap: "vmap".to_string(),
            twap: "twap".to_string(),
            hft: "hft".to_string(),
        }
    }
}

impl UnitPrefixes {
    pub fn prefix(&self, kind: AlgorithmKind) -> &str {
        match kind {
            AlgorithmKind::Vwap => &self.vwap,
            AlgorithmKind::Twap => &self.twap,
            AlgorithmKind::Hft => &self.hft,
        }
    }

    /// Deterministic unit name: `{prefix}-{algorithm_id}`
    pub fn unit_name(&self, kind: AlgorithmKind, algorithm_id: i64) -> String {
        format!("{}-{}", self.prefix(kind), algorithm_id)
    }
}

/// Client record owned by the CRUD API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub client_name: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub priority: f64,
    #[serde(default, rename = "needRestart")]
    pub need_restart: bool,
    pub spawned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client fields accepted on creation; the store assigns id and timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub client_name: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub cpu: String,
    #[serde(default)]
    pub memory: String,
    #[serde(default)]
    pub priority: f64,
    #[serde(default, rename = "needRestart")]
    pub need_restart: bool,
    #[serde(default)]
    pub spawned_at: Option<DateTime<Utc>>,
}

impl NewClient {
    pub fn named(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            version: 0,
            image: String::new(),
            cpu: String::new(),
            memory: String::new(),
            priority: 0.0,
            need_restart: false,
            spawned_at: None,
        }
    }

    /// Attach store-assigned id and timestamps
    pub fn into_client(self, id: i64, now: DateTime<Utc>) -> Client {
        Client {
            id,
            client_name: self.client_name,
            version: self.version,
            image: self.image,
            cpu: self.cpu,
            memory: self.memory,
            priority: self.priority,
            need_restart: self.need_restart,
            spawned_at: self.spawned_at,
            created_at: now,
            updated_at: now,
        }
    }
}
