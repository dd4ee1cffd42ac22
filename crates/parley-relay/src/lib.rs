//! parley-relay
//!
//! HTTP service in front of the upstream conversational backend: the
//! streaming chat relay plus the bot directory and logo upload routes.

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::middleware as axum_mw;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use parley_core::wire::{CONVERSATION_ID_HEADER, CONVERSATION_TOKEN_HEADER};

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upstream;

use state::AppState;

/// Build the service's router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(CONVERSATION_ID_HEADER),
            HeaderName::from_static(CONVERSATION_TOKEN_HEADER),
        ]);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/assets/{*key}", get(routes::assets::serve_asset))
        .route("/api/chat", post(routes::chat::relay_chat))
        .route(
            "/api/bots",
            get(routes::bots::list_bots).post(routes::bots::create_bot),
        )
        .route(
            "/api/bots/{id}",
            get(routes::bots::get_bot)
                .put(routes::bots::update_bot)
                .delete(routes::bots::delete_bot),
        )
        .route(
            "/api/uploads/logo",
            post(routes::uploads::upload_logo)
                .layer(DefaultBodyLimit::max(routes::uploads::UPLOAD_BODY_LIMIT)),
        )
        .layer(axum_mw::from_fn(middleware::audit::audit_log))
        .layer(cors)
        .with_state(state)
}
