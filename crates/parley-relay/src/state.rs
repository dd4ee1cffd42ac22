use std::sync::Arc;

use parley_storage::assets::{AssetStore, MemoryAssetStore, S3AssetStore};
use parley_storage::directory::{BotDirectory, MemoryBotDirectory, S3BotDirectory};

use crate::config::{RelayConfig, StorageBackend};
use crate::upstream::UpstreamClient;

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
    pub bots: Arc<dyn BotDirectory>,
    pub assets: Arc<dyn AssetStore>,
    /// Set when assets live in process memory; the relay then serves them
    /// itself under `/assets`.
    pub local_assets: Option<Arc<MemoryAssetStore>>,
}

impl AppState {
    pub fn new(
        upstream: UpstreamClient,
        bots: Arc<dyn BotDirectory>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            upstream,
            bots,
            assets,
            local_assets: None,
        }
    }

    /// Serve `store`'s contents from `/assets`. `store` should be the same
    /// store passed as `assets`.
    pub fn with_local_assets(mut self, store: Arc<MemoryAssetStore>) -> Self {
        self.local_assets = Some(store);
        self
    }

    pub async fn from_config(config: &RelayConfig) -> Self {
        let upstream = UpstreamClient::new(&config.upstream_url);

        match &config.storage {
            StorageBackend::Memory { asset_base_url } => {
                tracing::warn!("no PARLEY_BUCKET set, bots and logos are kept in memory");
                let assets = Arc::new(MemoryAssetStore::new(asset_base_url.clone()));
                Self::new(upstream, Arc::new(MemoryBotDirectory::new()), assets.clone())
                    .with_local_assets(assets)
            }
            StorageBackend::S3 {
                bucket,
                asset_base_url,
            } => {
                let s3 = parley_storage::client::build_client().await;
                Self::new(
                    upstream,
                    Arc::new(S3BotDirectory::new(s3.clone(), bucket.clone())),
                    Arc::new(S3AssetStore::new(s3, bucket.clone(), asset_base_url.clone())),
                )
            }
        }
    }
}
