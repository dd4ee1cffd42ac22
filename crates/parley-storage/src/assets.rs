//! Asset store: public hosting for uploaded images (bot logos).

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use parking_lot::RwLock;

use crate::error::StorageError;
use crate::objects;

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `body` under `key` and return its public URL.
    async fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Remove the asset behind a public URL. URLs this store does not host
    /// are ignored.
    async fn remove(&self, url: &str) -> Result<(), StorageError>;
}

/// Map a public URL back to its key, if it lives under `base_url`.
fn key_for_url<'a>(base_url: &str, url: &'a str) -> Option<&'a str> {
    url.strip_prefix(base_url)?
        .strip_prefix('/')
        .filter(|key| !key.is_empty())
}

/// Assets stored in S3 and served from `public_base_url` (the bucket's
/// website endpoint or a CDN in front of it).
#[derive(Clone)]
pub struct S3AssetStore {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3AssetStore {
    pub fn new(client: Client, bucket: impl Into<String>, public_base_url: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = body.len();
        objects::put_object(&self.client, &self.bucket, key, body, Some(content_type)).await?;
        tracing::info!(key, size, content_type, "asset uploaded");
        Ok(format!("{}/{key}", self.public_base_url))
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let Some(key) = key_for_url(&self.public_base_url, url) else {
            tracing::debug!(url, "not a hosted asset, skipping removal");
            return Ok(());
        };
        objects::delete_object(&self.client, &self.bucket, key).await?;
        tracing::info!(key, "asset removed");
        Ok(())
    }
}

/// Process-local asset store, keyed by object key.
pub struct MemoryAssetStore {
    base_url: String,
    assets: RwLock<HashMap<String, StoredAsset>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub body: Vec<u8>,
    pub content_type: String,
}

impl MemoryAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            assets: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<StoredAsset> {
        self.assets.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn upload(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.assets.write().insert(
            key.to_string(),
            StoredAsset {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{key}", self.base_url))
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        if let Some(key) = key_for_url(&self.base_url, url) {
            self.assets.write().remove(key);
        }
        Ok(())
    }
}
