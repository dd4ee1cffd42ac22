//! Bot directory: where bot records live.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use parking_lot::RwLock;
use uuid::Uuid;

use parley_core::models::bot::Bot;
use parley_core::s3_keys;

use crate::error::StorageError;
use crate::objects;

#[async_trait]
pub trait BotDirectory: Send + Sync {
    /// All bots, oldest first.
    async fn list(&self) -> Result<Vec<Bot>, StorageError>;

    /// A single bot, or [`StorageError::NotFound`].
    async fn get(&self, id: Uuid) -> Result<Bot, StorageError>;

    /// Insert or replace a bot record.
    async fn put(&self, bot: &Bot) -> Result<(), StorageError>;

    /// Remove a bot record, or [`StorageError::NotFound`] if it is absent.
    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;
}

fn sort_oldest_first(bots: &mut [Bot]) {
    bots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

/// Bot records stored as `bots/{id}.json` objects.
#[derive(Clone)]
pub struct S3BotDirectory {
    client: Client,
    bucket: String,
}

impl S3BotDirectory {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BotDirectory for S3BotDirectory {
    async fn list(&self) -> Result<Vec<Bot>, StorageError> {
        let keys = objects::list_objects(&self.client, &self.bucket, s3_keys::BOTS_PREFIX).await?;

        let mut bots = Vec::with_capacity(keys.len());
        for key in &keys {
            let body = objects::get_object(&self.client, &self.bucket, key).await?;
            bots.push(serde_json::from_slice(&body)?);
        }

        sort_oldest_first(&mut bots);
        Ok(bots)
    }

    async fn get(&self, id: Uuid) -> Result<Bot, StorageError> {
        let body = objects::get_object(&self.client, &self.bucket, &s3_keys::bot(id)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn put(&self, bot: &Bot) -> Result<(), StorageError> {
        let body = serde_json::to_vec(bot)?;
        objects::put_object(
            &self.client,
            &self.bucket,
            &s3_keys::bot(bot.id),
            body,
            Some("application/json"),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let key = s3_keys::bot(id);
        if !objects::object_exists(&self.client, &self.bucket, &key).await? {
            return Err(StorageError::NotFound { key });
        }
        objects::delete_object(&self.client, &self.bucket, &key).await
    }
}

/// Process-local directory. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryBotDirectory {
    bots: RwLock<HashMap<Uuid, Bot>>,
}

impl MemoryBotDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BotDirectory for MemoryBotDirectory {
    async fn list(&self) -> Result<Vec<Bot>, StorageError> {
        let mut bots: Vec<Bot> = self.bots.read().values().cloned().collect();
        sort_oldest_first(&mut bots);
        Ok(bots)
    }

    async fn get(&self, id: Uuid) -> Result<Bot, StorageError> {
        self.bots
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                key: s3_keys::bot(id),
            })
    }

    async fn put(&self, bot: &Bot) -> Result<(), StorageError> {
        self.bots.write().insert(bot.id, bot.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        self.bots
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound {
                key: s3_keys::bot(id),
            })
    }
}
