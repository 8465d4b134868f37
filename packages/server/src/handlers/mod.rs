pub mod grenade;
pub mod healthcheck;
pub mod image;

use axum::http::{Method, Uri};
use tracing::debug;

use crate::error::AppError;

/// Router fallback for paths that match no route.
pub async fn not_found(uri: Uri) -> AppError {
    debug!(path = %uri.path(), "No route matched");
    AppError::NotFound
}

/// Fallback for a known path requested with an unsupported method.
pub async fn method_not_allowed(method: Method) -> AppError {
    AppError::MethodNotAllowed(method)
}
