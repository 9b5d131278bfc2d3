//! Whole-object storage used for the configuration document and uploaded files.

pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use memory::InMemoryObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

/// Opaque version tag of a stored object (an ETag for S3)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectVersion(pub String);

impl std::fmt::Display for ObjectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub version: Option<ObjectVersion>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub size: u64,
    pub content_type: Option<String>,
    pub version: Option<ObjectVersion>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct PutObject {
    pub body: Bytes,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

impl PutObject {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(body, "application/json")
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Precondition attached to a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// Overwrite unconditionally
    Always,
    /// Only create; fail if the key exists
    Absent,
    /// Only replace the exact version that was read
    Matches(ObjectVersion),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Precondition failed writing {key}")]
    PreconditionFailed { key: String },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket (or equivalent) this store writes into
    fn bucket(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    async fn put(
        &self,
        key: &str,
        object: PutObject,
        condition: WriteCondition,
    ) -> Result<ObjectVersion, StorageError>;

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, StorageError>;
}
