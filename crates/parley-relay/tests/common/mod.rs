#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;

use parley_relay::state::AppState;
use parley_relay::upstream::UpstreamClient;
use parley_storage::assets::MemoryAssetStore;
use parley_storage::directory::MemoryBotDirectory;

pub const ASSET_BASE_URL: &str = "https://assets.test";

/// Nothing listens here; connections are refused.
pub const DEAD_UPSTREAM: &str = "http://127.0.0.1:1";

pub struct TestApp {
    pub router: Router,
    pub bots: Arc<MemoryBotDirectory>,
    pub assets: Arc<MemoryAssetStore>,
}

pub fn app(upstream_url: &str) -> TestApp {
    let bots = Arc::new(MemoryBotDirectory::new());
    let assets = Arc::new(MemoryAssetStore::new(ASSET_BASE_URL));
    let state = AppState::new(UpstreamClient::new(upstream_url), bots.clone(), assets.clone())
        .with_local_assets(assets.clone());
    TestApp {
        router: parley_relay::router(state),
        bots,
        assets,
    }
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
