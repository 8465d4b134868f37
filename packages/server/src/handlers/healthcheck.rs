use axum::extract::State;
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::models::envelope::{JsonResponse, encode_value};
use crate::state::AppState;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize, utoipa::ToSchema)]
pub struct SystemInfo {
    #[schema(example = "development")]
    pub environment: String,
    #[schema(example = "1.0.0")]
    pub version: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "available")]
    pub status: String,
    pub system_info: SystemInfo,
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "Health",
    operation_id = "healthcheck",
    summary = "Report service availability",
    responses(
        (status = 200, description = "Service is available", body = HealthResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn healthcheck(State(state): State<AppState>) -> Result<JsonResponse, AppError> {
    let body = encode_value(&HealthResponse {
        status: "available".into(),
        system_info: SystemInfo {
            environment: state.config.server.environment.clone(),
            version: API_VERSION.into(),
        },
    })?;
    Ok(JsonResponse::ok(body))
}
