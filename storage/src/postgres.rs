//! PostgreSQL store
//!
//! Owns the connection pool and bootstraps the two tables on connect. Every
//! query runs under `query_timeout` so a hung connection surfaces as
//! `StorageError::Unavailable` instead of stalling the caller.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use shared::{process_debug, process_error, AlgorithmFlags, AlgorithmStatus, Client, NewClient, ProcessId};

use crate::error::{StorageError, StorageResult};
use crate::traits::{ClientStore, DesiredStateReader};

const SCHEMA: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS clients (
        id BIGSERIAL PRIMARY KEY,
        client_name VARCHAR(100) NOT NULL UNIQUE,
        version INT NOT NULL DEFAULT 0,
        image VARCHAR(255) NOT NULL DEFAULT '',
        cpu VARCHAR(50) NOT NULL DEFAULT '',
        memory VARCHAR(50) NOT NULL DEFAULT '',
        priority DOUBLE PRECISION NOT NULL DEFAULT 0,
        need_restart BOOLEAN NOT NULL DEFAULT FALSE,
        spawned_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )"#,
    r#"CREATE TABLE IF NOT EXISTS algorithm_status (
        id BIGSERIAL PRIMARY KEY,
        client_id BIGINT REFERENCES clients(id),
        vwap BOOLEAN NOT NULL DEFAULT FALSE,
        twap BOOLEAN NOT NULL DEFAULT FALSE,
        hft BOOLEAN NOT NULL DEFAULT FALSE
    )"#,
];

// Casts keep reads compatible with tables created with SERIAL/TIMESTAMP columns.
const CLIENT_COLUMNS: &str = "id::BIGINT AS id, client_name, version, image, cpu, memory, \
     priority::DOUBLE PRECISION AS priority, need_restart, spawned_at::TIMESTAMPTZ AS spawned_at, \
     created_at::TIMESTAMPTZ AS created_at, updated_at::TIMESTAMPTZ AS updated_at";

const ALGORITHM_COLUMNS: &str = "id::BIGINT, client_id::BIGINT, vwap, twap, hft";

/// Connection settings for [`PgStore`]
#[derive(Debug, Clone)]
pub struct PgStoreConfig {
    pub url: String,
    pub max_connections: u32,
    /// Bound on acquiring a pooled connection, including initial setup
    pub connect_timeout: Duration,
    /// Bound on each individual query
    pub query_timeout: Duration,
}

impl PgStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            connect_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }
}

#[derive(FromRow)]
struct ClientRow {
    id: i64,
    client_name: String,
    version: Option<i32>,
    image: Option<String>,
    cpu: Option<String>,
    memory: Option<String>,
    priority: Option<f64>,
    need_restart: Option<bool>,
    spawned_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        let now = Utc::now();
        Client {
            id: row.id,
            client_name: row.client_name,
            version: row.version.unwrap_or_default(),
            image: row.image.unwrap_or_default(),
            cpu: row.cpu.unwrap_or_default(),
            memory: row.memory.unwrap_or_default(),
            priority: row.priority.unwrap_or_default(),
            need_restart: row.need_restart.unwrap_or_default(),
            spawned_at: row.spawned_at,
            created_at: row.created_at.unwrap_or(now),
            updated_at: row.updated_at.unwrap_or(now),
        }
    }
}

type AlgorithmRow = (i64, Option<i64>, Option<bool>, Option<bool>, Option<bool>);

fn algorithm_from_row((algorithm_id, client_id, vwap, twap, hft): AlgorithmRow) -> AlgorithmStatus {
    AlgorithmStatus {
        algorithm_id,
        client_id: client_id.unwrap_or_default(),
        vwap: vwap.unwrap_or(false),
        twap: twap.unwrap_or(false),
        hft: hft.unwrap_or(false),
    }
}

/// Map connectivity failures to `Unavailable`, keep everything else as a database error
fn classify(err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
            StorageError::unavailable(err.to_string())
        }
        other => StorageError::Database(other),
    }
}

pub struct PgStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgStore {
    /// Connect, verify the connection and create missing tables
    pub async fn connect(config: &PgStoreConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| {
                process_error!(ProcessId::current(), "❌ Failed to connect to database: {}", e);
                StorageError::unavailable(format!("failed to connect to database: {e}"))
            })?;

        let store = Self::from_pool(pool, config.query_timeout);
        store.create_tables().await?;
        process_debug!(ProcessId::current(), "🗄️ Database schema ready");
        Ok(store)
    }

    pub fn from_pool(pool: PgPool, query_timeout: Duration) -> Self {
        Self { pool, query_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn create_tables(&self) -> StorageResult<()> {
        self.bounded("create tables", async {
            let mut tx = self.pool.begin().await?;
            for statement in SCHEMA {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            tx.commit().await
        })
        .await
    }

    /// Run one database operation under the query timeout
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> StorageResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                process_error!(ProcessId::current(), "❌ Database operation '{}' failed: {}", operation, e);
                Err(classify(e))
            }
            Err(_) => {
                process_error!(
                    ProcessId::current(),
                    "⏱️ Database operation '{}' timed out after {:?}",
                    operation,
                    self.query_timeout
                );
                Err(StorageError::unavailable(format!(
                    "{operation} timed out after {:?}",
                    self.query_timeout
                )))
            }
        }
    }
}

#[async_trait]
impl DesiredStateReader for PgStore {
    async fn list_desired_algorithm_states(&self) -> StorageResult<Vec<AlgorithmStatus>> {
        let query = format!("SELECT {ALGORITHM_COLUMNS} FROM algorithm_status ORDER BY id");
        let rows = self
            .bounded(
                "select algorithms",
                sqlx::query_as::<_, AlgorithmRow>(&query).fetch_all(&self.pool),
            )
            .await?;

        Ok(rows.into_iter().map(algorithm_from_row).collect())
    }
}

#[async_trait]
impl ClientStore for PgStore {
    async fn add_client(&self, client: NewClient) -> StorageResult<Client> {
        let client_name = client.client_name.clone();
        let insert_client = format!(
            "INSERT INTO clients (client_name, version, image, cpu, memory, priority, need_restart, spawned_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {CLIENT_COLUMNS}"
        );

        let result = self
            .bounded("insert client", async {
                let mut tx = self.pool.begin().await?;
                let row = sqlx::query_as::<_, ClientRow>(&insert_client)
                    .bind(&client.client_name)
                    .bind(client.version)
                    .bind(&client.image)
                    .bind(&client.cpu)
                    .bind(&client.memory)
                    .bind(client.priority)
                    .bind(client.need_restart)
                    .bind(client.spawned_at)
                    .fetch_one(&mut *tx)
                    .await?;
                sqlx::query("INSERT INTO algorithm_status (client_id, vwap, twap, hft) VALUES ($1, DEFAULT, DEFAULT, DEFAULT)")
                    .bind(row.id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(row)
            })
            .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(StorageError::Database(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                Err(StorageError::ClientConflict { client_name })
            }
            Err(e) => Err(e),
        }
    }

    async fn update_client(&self, client: Client) -> StorageResult<Client> {
        let query = format!(
            "UPDATE clients SET client_name=$1, version=$2, image=$3, cpu=$4, memory=$5, priority=$6, \
             need_restart=$7, spawned_at=$8, updated_at=$9 WHERE id=$10 RETURNING {CLIENT_COLUMNS}"
        );

        let result = self
            .bounded(
                "update client",
                sqlx::query_as::<_, ClientRow>(&query)
                    .bind(&client.client_name)
                    .bind(client.version)
                    .bind(&client.image)
                    .bind(&client.cpu)
                    .bind(&client.memory)
                    .bind(client.priority)
                    .bind(client.need_restart)
                    .bind(client.spawned_at)
                    .bind(Utc::now())
                    .bind(client.id)
                    .fetch_optional(&self.pool),
            )
            .await;

        match result {
            Ok(Some(row)) => Ok(row.into()),
            Ok(None) => Err(StorageError::ClientNotFound { client_id: client.id }),
            Err(StorageError::Database(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                Err(StorageError::ClientConflict {
                    client_name: client.client_name,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_client(&self, client_id: i64) -> StorageResult<()> {
        let deleted = self
            .bounded("delete client", async {
                let mut tx = self.pool.begin().await?;
                sqlx::query("DELETE FROM algorithm_status WHERE client_id=$1")
                    .bind(client_id)
                    .execute(&mut *tx)
                    .await?;
                let result = sqlx::query("DELETE FROM clients WHERE id=$1")
                    .bind(client_id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<_, sqlx::Error>(result.rows_affected())
            })
            .await?;

        if deleted == 0 {
            return Err(StorageError::ClientNotFound { client_id });
        }
        Ok(())
    }

    async fn update_algorithm_status(&self, flags: AlgorithmFlags) -> StorageResult<AlgorithmStatus> {
        let query = format!(
            "UPDATE algorithm_status SET vwap=$1, twap=$2, hft=$3 WHERE client_id=$4 RETURNING {ALGORITHM_COLUMNS}"
        );

        let row = self
            .bounded(
                "update algorithm status",
                sqlx::query_as::<_, AlgorithmRow>(&query)
                    .bind(flags.vwap)
                    .bind(flags.twap)
                    .bind(flags.hft)
                    .bind(flags.client_id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        row.map(algorithm_from_row).ok_or(StorageError::ClientNotFound {
            client_id: flags.client_id,
        })
    }

    async fn get_client(&self, client_id: i64) -> StorageResult<Option<Client>> {
        let query = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id=$1");
        let row = self
            .bounded(
                "select client",
                sqlx::query_as::<_, ClientRow>(&query)
                    .bind(client_id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        Ok(row.map(Client::from))
    }
}
