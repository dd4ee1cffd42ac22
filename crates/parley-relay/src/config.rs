//! Start-up configuration, read from the environment once.

use std::env;
use std::net::SocketAddr;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_UPSTREAM_URL: &str = "https://backend.prod.askturing.ai";
const DEFAULT_MEMORY_ASSET_BASE_URL: &str = "http://localhost:3000/assets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind_addr: SocketAddr,
    /// Base URL of the upstream conversational backend.
    pub upstream_url: String,
    pub storage: StorageBackend,
}

/// Where bot records and uploaded logos live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory. Nothing survives a restart.
    Memory { asset_base_url: String },
    /// An S3 bucket, with assets served from `asset_base_url`.
    S3 {
        bucket: String,
        asset_base_url: String,
    },
}

impl StorageBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageBackend::Memory { .. } => "memory",
            StorageBackend::S3 { .. } => "s3",
        }
    }
}

impl RelayConfig {
    /// Read `PARLEY_BIND_ADDR`, `PARLEY_UPSTREAM_URL`, `PARLEY_BUCKET` and
    /// `PARLEY_ASSET_BASE_URL`.
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = var("PARLEY_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| eyre::eyre!("invalid PARLEY_BIND_ADDR: {e}"))?;

        let upstream_url = var("PARLEY_UPSTREAM_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !upstream_url.starts_with("http://") && !upstream_url.starts_with("https://") {
            return Err(eyre::eyre!(
                "PARLEY_UPSTREAM_URL must be an http(s) URL, got {upstream_url}"
            ));
        }

        let asset_base_url = var("PARLEY_ASSET_BASE_URL");
        let storage = match var("PARLEY_BUCKET") {
            Some(bucket) => StorageBackend::S3 {
                asset_base_url: asset_base_url
                    .unwrap_or_else(|| format!("https://{bucket}.s3.amazonaws.com")),
                bucket,
            },
            None => StorageBackend::Memory {
                asset_base_url: asset_base_url
                    .unwrap_or_else(|| DEFAULT_MEMORY_ASSET_BASE_URL.to_string()),
            },
        };

        Ok(Self {
            bind_addr,
            upstream_url,
            storage,
        })
    }
}
