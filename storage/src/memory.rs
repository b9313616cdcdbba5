//! In-memory store
//!
//! Mirrors the PostgreSQL semantics (unique client names, one algorithm
//! record per client, cascading delete) without any I/O.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use shared::{AlgorithmFlags, AlgorithmStatus, Client, NewClient};

use crate::error::{StorageError, StorageResult};
use crate::traits::{ClientStore, DesiredStateReader};

#[derive(Default)]
struct Tables {
    clients: BTreeMap<i64, Client>,
    algorithms: BTreeMap<i64, AlgorithmStatus>,
    next_client_id: i64,
    next_algorithm_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed algorithm records directly, bypassing client creation
    pub async fn with_algorithms(records: impl IntoIterator<Item = AlgorithmStatus>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().await;
            for record in records {
                tables.next_algorithm_id = tables.next_algorithm_id.max(record.algorithm_id);
                tables.algorithms.insert(record.algorithm_id, record);
            }
        }
        store
    }

    /// Overwrite one algorithm record in place, as an operator editing the table would
    pub async fn put_algorithm(&self, record: AlgorithmStatus) {
        let mut tables = self.tables.write().await;
        tables.next_algorithm_id = tables.next_algorithm_id.max(record.algorithm_id);
        tables.algorithms.insert(record.algorithm_id, record);
    }

    /// Simulate connectivity loss; every call fails with `Unavailable` while set
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("memory store is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl DesiredStateReader for MemoryStore {
    async fn list_desired_algorithm_states(&self) -> StorageResult<Vec<AlgorithmStatus>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables.algorithms.values().copied().collect())
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn add_client(&self, client: NewClient) -> StorageResult<Client> {
        self.check_online()?;
        let mut tables = self.tables.write().await;

        if tables.clients.values().any(|c| c.client_name == client.client_name) {
            return Err(StorageError::ClientConflict {
                client_name: client.client_name,
            });
        }

        tables.next_client_id += 1;
        tables.next_algorithm_id += 1;
        let client_id = tables.next_client_id;
        let algorithm_id = tables.next_algorithm_id;

        let stored = client.into_client(client_id, Utc::now());
        tables.clients.insert(client_id, stored.clone());
        tables
            .algorithms
            .insert(algorithm_id, AlgorithmStatus::disabled(algorithm_id, client_id));

        Ok(stored)
    }

    async fn update_client(&self, client: Client) -> StorageResult<Client> {
        self.check_online()?;
        let mut tables = self.tables.write().await;

        let name_taken = tables
            .clients
            .values()
            .any(|c| c.id != client.id && c.client_name == client.client_name);
        if name_taken {
            return Err(StorageError::ClientConflict {
                client_name: client.client_name,
            });
        }

        let existing = tables
            .clients
            .get_mut(&client.id)
            .ok_or(StorageError::ClientNotFound { client_id: client.id })?;

        let created_at = existing.created_at;
        *existing = Client {
            created_at,
            updated_at: Utc::now(),
            ..client
        };
        Ok(existing.clone())
    }

    async fn delete_client(&self, client_id: i64) -> StorageResult<()> {
        self.check_online()?;
        let mut tables = self.tables.write().await;

        if tables.clients.remove(&client_id).is_none() {
            return Err(StorageError::ClientNotFound { client_id });
        }
        tables.algorithms.retain(|_, a| a.client_id != client_id);
        Ok(())
    }

    async fn update_algorithm_status(&self, flags: AlgorithmFlags) -> StorageResult<AlgorithmStatus> {
        self.check_online()?;
        let mut tables = self.tables.write().await;

        let record = tables
            .algorithms
            .values_mut()
            .find(|a| a.client_id == flags.client_id)
            .ok_or(StorageError::ClientNotFound {
                client_id: flags.client_id,
            })?;

        record.vwap = flags.vwap;
        record.twap = flags.twap;
        record.hft = flags.hft;
        Ok(*record)
    }

    async fn get_client(&self, client_id: i64) -> StorageResult<Option<Client>> {
        self.check_online()?;
        let tables = self.tables.read().await;
        Ok(tables.clients.get(&client_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_client_starts_with_all_flags_off() {
        let store = MemoryStore::new();
        let client = store.add_client(NewClient::named("acme")).await.unwrap();

        let states = store.list_desired_algorithm_states().await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].client_id, client.id);
        assert!(!states[0].vwap && !states[0].twap && !states[0].hft);
    }

    #[tokio::test]
    async fn test_duplicate_client_name_conflicts() {
        let store = MemoryStore::new();
        store.add_client(NewClient::named("acme")).await.unwrap();

        let result = store.add_client(NewClient::named("acme")).await;
        assert!(matches!(result, Err(StorageError::ClientConflict { .. })));
    }

    #[tokio::test]
    async fn test_delete_client_removes_algorithm_record() {
        let store = MemoryStore::new();
        let keep = store.add_client(NewClient::named("keep")).await.unwrap();
        let drop = store.add_client(NewClient::named("drop")).await.unwrap();

        store.delete_client(drop.id).await.unwrap();

        let states = store.list_desired_algorithm_states().await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].client_id, keep.id);
        assert!(store.get_client(drop.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_flags_by_client() {
        let store = MemoryStore::new();
        let client = store.add_client(NewClient::named("acme")).await.unwrap();

        let updated = store
            .update_algorithm_status(AlgorithmFlags {
                client_id: client.id,
                vwap: true,
                twap: false,
                hft: true,
            })
            .await
            .unwrap();

        assert!(updated.vwap && updated.hft && !updated.twap);
        assert_eq!(store.list_desired_algorithm_states().await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn test_unknown_client_is_not_found() {
        let store = MemoryStore::new();
        let flags = AlgorithmFlags {
            client_id: 99,
            vwap: true,
            twap: false,
            hft: false,
        };

        assert!(matches!(
            store.update_algorithm_status(flags).await,
            Err(StorageError::ClientNotFound { client_id: 99 })
        ));
        assert!(matches!(
            store.delete_client(99).await,
            Err(StorageError::ClientNotFound { client_id: 99 })
        ));
    }

    #[tokio::test]
    async fn test_offline_store_is_unavailable() {
        let store = MemoryStore::with_algorithms([AlgorithmStatus::disabled(1, 1)]).await;
        store.set_offline(true);

        let err = store.list_desired_algorithm_states().await.unwrap_err();
        assert!(err.is_unavailable());

        store.set_offline(false);
        assert_eq!(store.list_desired_algorithm_states().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_store_returns_empty_snapshot() {
        let store = MemoryStore::new();
        assert!(store.list_desired_algorithm_states().await.unwrap().is_empty());
    }
}
