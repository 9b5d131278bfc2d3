use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{error::SdkError, primitives::ByteStream, Client};

use super::{ObjectHead, ObjectStore, ObjectVersion, PutObject, StorageError, StoredObject, WriteCondition};
use crate::config::StorageConfig;

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS configuration, applying the
    /// region/endpoint overrides from `storage`.
    pub async fn from_config(storage: &StorageConfig, bucket: impl Into<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &storage.s3_region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &storage.s3_endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(storage.s3_force_path_style)
            .build();

        Self::new(Client::from_conf(s3_config), bucket)
    }
}

fn to_btree(metadata: Option<&HashMap<String, String>>) -> BTreeMap<String, String> {
    metadata
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match request {
            Ok(output) => {
                let content_type = output.content_type().map(str::to_string);
                let version = output.e_tag().map(|tag| ObjectVersion(tag.to_string()));
                let metadata = to_btree(output.metadata());
                let body = output
                    .body
                    .collect()
                    .await
                    .map_err(anyhow::Error::new)?
                    .into_bytes();

                Ok(Some(StoredObject {
                    body,
                    content_type,
                    version,
                    metadata,
                }))
            }
            Err(SdkError::ServiceError(err)) if err.err().is_no_such_key() => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).into()),
        }
    }

    async fn put(
        &self,
        key: &str,
        object: PutObject,
        condition: WriteCondition,
    ) -> Result<ObjectVersion, StorageError> {
        let metadata: HashMap<String, String> = object.metadata.into_iter().collect();

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(object.content_type)
            .set_metadata(Some(metadata))
            .body(ByteStream::from(object.body));

        request = match condition {
            WriteCondition::Always => request,
            WriteCondition::Absent => request.if_none_match("*"),
            WriteCondition::Matches(version) => request.if_match(version.0),
        };

        match request.send().await {
            Ok(output) => Ok(ObjectVersion(output.e_tag().unwrap_or_default().to_string())),
            // 412 for a failed If-Match / If-None-Match, 409 for a concurrent conditional write
            Err(SdkError::ServiceError(err)) if matches!(err.raw().status().as_u16(), 409 | 412) => {
                Err(StorageError::PreconditionFailed { key: key.to_string() })
            }
            Err(e) => Err(anyhow::Error::new(e).into()),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectHead>, StorageError> {
        let request = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match request {
            Ok(output) => Ok(Some(ObjectHead {
                size: output.content_length().unwrap_or_default().max(0) as u64,
                content_type: output.content_type().map(str::to_string),
                version: output.e_tag().map(|tag| ObjectVersion(tag.to_string())),
                metadata: to_btree(output.metadata()),
            })),
            Err(SdkError::ServiceError(err)) if err.err().is_not_found() => Ok(None),
            Err(e) => Err(anyhow::Error::new(e).into()),
        }
    }
}
