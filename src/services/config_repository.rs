use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Broker, BrokerPatch, Config, Employer, EmployerPatch, Tpa, TpaPatch, TreeError};
use crate::storage::{ObjectStore, ObjectVersion, PutObject, StorageError, WriteCondition};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error accessing configuration: {0}")]
    Storage(StorageError),

    #[error("Invalid configuration format: {0}")]
    Format(#[from] serde_json::Error),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("Configuration was modified concurrently; reload and retry")]
    Conflict,
}

impl From<StorageError> for ConfigError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PreconditionFailed { .. } => ConfigError::Conflict,
            other => ConfigError::Storage(other),
        }
    }
}

/// The configuration document as read, plus the version it was read at
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub config: Config,
    pub version: Option<ObjectVersion>,
}

/// Loads and persists the single configuration document.
///
/// Mutations read the whole document, change it in memory and write it back
/// only if nobody else wrote in between; otherwise they fail with
/// [`ConfigError::Conflict`].
#[derive(Clone)]
pub struct ConfigRepository {
    store: Arc<dyn ObjectStore>,
    key: String,
}

impl ConfigRepository {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Read the document and its version, creating an empty one on first use.
    pub async fn load(&self) -> Result<ConfigSnapshot, ConfigError> {
        if let Some(snapshot) = self.read().await? {
            return Ok(snapshot);
        }

        let empty = Config::empty();
        let body = serde_json::to_vec_pretty(&empty)?;

        match self.store.put(&self.key, PutObject::json(body), WriteCondition::Absent).await {
            Ok(version) => {
                info!("Initialized empty configuration at s3://{}/{}", self.store.bucket(), self.key);
                Ok(ConfigSnapshot {
                    config: empty,
                    version: Some(version),
                })
            }
            Err(StorageError::PreconditionFailed { .. }) => {
                debug!("Configuration was created concurrently, re-reading");
                self.read().await?.ok_or(ConfigError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self) -> Result<Option<ConfigSnapshot>, ConfigError> {
        let Some(object) = self.store.get(&self.key).await? else {
            return Ok(None);
        };

        let config: Config = serde_json::from_slice(&object.body)?;
        debug!(
            "Retrieved configuration ({} tenants, version {:?})",
            config.tpas.len(),
            object.version
        );

        Ok(Some(ConfigSnapshot {
            config,
            version: object.version,
        }))
    }

    pub async fn get_config(&self) -> Result<Config, ConfigError> {
        Ok(self.load().await?.config)
    }

    /// Overwrite the document unconditionally.
    pub async fn save_config(&self, config: &Config) -> Result<ObjectVersion, ConfigError> {
        let body = serde_json::to_vec_pretty(config)?;
        let version = self
            .store
            .put(&self.key, PutObject::json(body), WriteCondition::Always)
            .await?;
        Ok(version)
    }

    pub async fn get_tpa_by_id(&self, tpa_id: &str) -> Result<Option<Tpa>, ConfigError> {
        Ok(self.get_config().await?.tpa(tpa_id).cloned())
    }

    async fn save_snapshot(&self, snapshot: &ConfigSnapshot) -> Result<ObjectVersion, ConfigError> {
        let body = serde_json::to_vec_pretty(&snapshot.config)?;
        let condition = match &snapshot.version {
            Some(version) => WriteCondition::Matches(version.clone()),
            None => WriteCondition::Always,
        };

        match self.store.put(&self.key, PutObject::json(body), condition).await {
            Ok(version) => Ok(version),
            Err(StorageError::PreconditionFailed { .. }) => {
                warn!("Configuration write rejected: document changed since it was read");
                Err(ConfigError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load, apply `op`, and persist when `op` reports a change.
    async fn modify<T, F>(&self, op: F) -> Result<T, ConfigError>
    where
        F: FnOnce(&mut Config) -> Result<(T, bool), TreeError>,
    {
        let mut snapshot = self.load().await?;
        let (result, changed) = op(&mut snapshot.config)?;

        if changed {
            self.save_snapshot(&snapshot).await?;
        }

        Ok(result)
    }

    pub async fn update_tpa(&self, patch: TpaPatch) -> Result<Tpa, ConfigError> {
        let tpa = self
            .modify(|config| Ok((config.upsert_tpa(patch).clone(), true)))
            .await?;
        info!("Upserted TPA {}", tpa.id);
        Ok(tpa)
    }

    pub async fn update_broker(&self, tpa_id: &str, patch: BrokerPatch) -> Result<Broker, ConfigError> {
        let broker = self
            .modify(|config| Ok((config.upsert_broker(tpa_id, patch)?.clone(), true)))
            .await?;
        info!("Upserted broker {} in TPA {}", broker.id, tpa_id);
        Ok(broker)
    }

    pub async fn update_employer(
        &self,
        tpa_id: &str,
        broker_id: &str,
        patch: EmployerPatch,
    ) -> Result<Employer, ConfigError> {
        let employer = self
            .modify(|config| Ok((config.upsert_employer(tpa_id, broker_id, patch)?.clone(), true)))
            .await?;
        info!("Upserted employer {} under broker {} in TPA {}", employer.id, broker_id, tpa_id);
        Ok(employer)
    }

    /// Remove a broker and its employers. Absent brokers are not an error.
    pub async fn delete_broker(&self, tpa_id: &str, broker_id: &str) -> Result<Option<Broker>, ConfigError> {
        let removed = self
            .modify(|config| {
                let removed = config.delete_broker(tpa_id, broker_id)?;
                let changed = removed.is_some();
                Ok((removed, changed))
            })
            .await?;

        match &removed {
            Some(broker) => info!(
                "Deleted broker {} ({} employers) from TPA {}",
                broker.id,
                broker.employers.len(),
                tpa_id
            ),
            None => debug!("Broker {} not present in TPA {}, nothing to delete", broker_id, tpa_id),
        }
        Ok(removed)
    }

    /// Remove an employer. Absent employers are not an error.
    pub async fn delete_employer(
        &self,
        tpa_id: &str,
        broker_id: &str,
        employer_id: &str,
    ) -> Result<Option<Employer>, ConfigError> {
        let removed = self
            .modify(|config| {
                let removed = config.delete_employer(tpa_id, broker_id, employer_id)?;
                let changed = removed.is_some();
                Ok((removed, changed))
            })
            .await?;

        if removed.is_some() {
            info!("Deleted employer {} from broker {} in TPA {}", employer_id, broker_id, tpa_id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryObjectStore;
    use serde_json::json;

    fn repository() -> (Arc<InMemoryObjectStore>, ConfigRepository) {
        let store = Arc::new(InMemoryObjectStore::new("config-bucket"));
        let repo = ConfigRepository::new(store.clone(), "config.json");
        (store, repo)
    }

    async fn seeded() -> ConfigRepository {
        let (_, repo) = repository();
        repo.update_tpa(TpaPatch {
            id: "t1".into(),
            name: Some("T".into()),
            ..Default::default()
        })
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn first_read_initializes_empty_document() {
        let (store, repo) = repository();

        let config = repo.get_config().await.unwrap();
        assert!(config.tpas.is_empty());

        let stored = store.get("config.json").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(value, json!({ "tpas": [] }));
    }

    #[tokio::test]
    async fn corrupt_document_is_a_format_error() {
        let (store, repo) = repository();
        store
            .put("config.json", PutObject::json("not json"), WriteCondition::Always)
            .await
            .unwrap();

        assert!(matches!(repo.get_config().await, Err(ConfigError::Format(_))));
    }

    #[tokio::test]
    async fn save_of_loaded_config_is_idempotent() {
        let repo = seeded().await;
        let before = repo.get_config().await.unwrap();

        repo.save_config(&before).await.unwrap();
        assert_eq!(repo.get_config().await.unwrap(), before);
    }

    #[tokio::test]
    async fn get_tpa_by_id_returns_none_for_unknown() {
        let repo = seeded().await;
        assert!(repo.get_tpa_by_id("t1").await.unwrap().is_some());
        assert!(repo.get_tpa_by_id("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn broker_and_employer_lifecycle() {
        let repo = seeded().await;

        let broker = repo
            .update_broker("t1", BrokerPatch { id: "b1".into(), name: Some("Acme".into()), ..Default::default() })
            .await
            .unwrap();
        assert!(broker.employers.is_empty());

        let employer = repo
            .update_employer("t1", "b1", EmployerPatch { id: "e1".into(), name: Some("E1".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(employer.name, "E1");

        repo.delete_employer("t1", "b1", "e1").await.unwrap();
        let tpa = repo.get_tpa_by_id("t1").await.unwrap().unwrap();
        assert!(tpa.brokers[0].employers.is_empty());

        repo.delete_broker("t1", "b1").await.unwrap();
        assert!(repo.get_tpa_by_id("t1").await.unwrap().unwrap().brokers.is_empty());
    }

    #[tokio::test]
    async fn deleting_unknown_broker_does_not_write() {
        let (store, repo) = repository();
        repo.update_tpa(TpaPatch { id: "t1".into(), ..Default::default() }).await.unwrap();
        let version_before = store.head("config.json").await.unwrap().unwrap().version;

        assert!(repo.delete_broker("t1", "doesnotexist").await.unwrap().is_none());

        let version_after = store.head("config.json").await.unwrap().unwrap().version;
        assert_eq!(version_before, version_after);
    }

    #[tokio::test]
    async fn unknown_broker_surfaces_tree_error() {
        let repo = seeded().await;
        let err = repo
            .update_employer("t1", "ghost", EmployerPatch { id: "e1".into(), ..Default::default() })
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::Tree(TreeError::BrokerNotFound { .. })));
    }

    #[tokio::test]
    async fn concurrent_write_is_detected() {
        let (store, repo) = repository();
        repo.update_tpa(TpaPatch { id: "t1".into(), ..Default::default() }).await.unwrap();

        // Another writer lands between our read and our write
        let stale = repo.load().await.unwrap();
        repo.update_tpa(TpaPatch { id: "t2".into(), ..Default::default() }).await.unwrap();

        let err = repo.save_snapshot(&stale).await.unwrap_err();
        assert!(matches!(err, ConfigError::Conflict));

        let config = repo.get_config().await.unwrap();
        assert_eq!(config.tpas.len(), 2);
        assert!(store.get("config.json").await.unwrap().is_some());
    }
}
