pub mod cache;
pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod server;
pub mod state;
pub mod validator;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{CorsConfig, StorageBackend};
use crate::middleware::rate_limit::{RateLimiter, limit_by_ip};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CS2 Grenades API",
        version = "1.0.0",
        description = "Catalogue of CS2 grenade line-ups and their images"
    ),
    tags(
        (name = "Health", description = "Service status"),
        (name = "Grenades", description = "Grenade line-up CRUD and listing"),
        (name = "Images", description = "Image upload and management"),
    ),
)]
struct ApiDoc;

/// Build the application router.
///
/// `limiter` installs per-IP rate limiting when present.
pub fn build_router(state: AppState, limiter: Option<Arc<RateLimiter>>) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::api_routes())
        .split_for_parts();

    let mut router = router
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::method_not_allowed);

    let storage = &state.config.storage;
    if storage.backend == StorageBackend::Filesystem {
        router = router.nest_service(
            &storage.images_url_prefix,
            ServeDir::new(&storage.images_dir),
        );
    }

    let cors = cors_layer(&state.config.server.cors);

    let mut router = router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api));

    if let Some(limiter) = limiter {
        router = router.layer(axum::middleware::from_fn_with_state(limiter, limit_by_ip));
    }
    if let Some(cors) = cors {
        router = router.layer(cors);
    }
    router
}

fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .trusted_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(Duration::from_secs(config.max_age)),
    )
}
