use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ObjectHead, ObjectStore, ObjectVersion, PutObject, StorageError, StoredObject, WriteCondition};

#[derive(Debug)]
struct Entry {
    object: PutObject,
    version: u64,
}

/// Process-local object store. Versions are a per-store monotonic counter.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: Mutex<HashMap<String, Entry>>,
    next_version: Mutex<u64>,
}

impl InMemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn version_tag(version: u64) -> ObjectVersion {
        ObjectVersion(format!("\"v{}\"", version))
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(self.objects.lock().await.get(key).map(|entry| StoredObject {
            body: entry.object.body.clone(),
            content_type: Some(entry.object.content_type.clone()),
            version: Some(Self::version_tag(entry.version)),
            metadata: entry.object.metadata.clone(),
        }))
    }

    async fn put(
        &self,
        key: &str,
        object: PutObject,
        condition: WriteCondition,
    ) -> Result<ObjectVersion, StorageError> {
        let mut objects = self.objects.lock().await;

        let current = objects.get(key).map(|entry| Self::version_tag(entry.version));
        let allowed = match (&condition, &current) {
            (WriteCondition::Always, _) => true,
            (WriteCondition::Absent, existing) => existing.is_none(),
            (WriteCondition::Matches(expected), Some(actual)) => expected == actual,
            (WriteCondition::Matches(_), None) => false,
        };

        if !allowed {
            return Err(StorageError::PreconditionFailed { key: key.to_string() });
        }

        let mut next_version = self.next_version.lock().await;
        *next_version += 1;
        let version = *next_version;

        objects.insert(key.to_string(), Entry { object, version });
        Ok(Self::version_tag(version))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, StorageError> {
        Ok(self.objects.lock().await.get(key).map(|entry| ObjectHead {
            size: entry.object.body.len() as u64,
            content_type: Some(entry.object.content_type.clone()),
            version: Some(Self::version_tag(entry.version)),
            metadata: entry.object.metadata.clone(),
        }))
    }
}
