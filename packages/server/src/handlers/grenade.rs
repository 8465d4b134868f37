use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use futures::{StreamExt, TryStreamExt, stream};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, instrument, warn};

use crate::cache::DEFAULT_EXPIRATION;
use crate::entity::grenade;
use crate::error::{AppError, ErrorBody, ValidationErrorBody};
use crate::extractors::id::ResourceId;
use crate::extractors::json::AppJson;
use crate::models::envelope::{JsonResponse, encode};
use crate::models::filters::{Filters, GRENADE_SORT_SAFE_LIST};
use crate::models::grenade::*;
use crate::models::image::ImageResponse;
use crate::models::shared::MessageEnvelope;
use crate::repository::grenade::GrenadeFilter;
use crate::repository::{GrenadeRepository, ImageRepository, RepoError};
use crate::state::AppState;
use crate::validator::Validator;

/// Public path of the grenade collection; cache keys and `Location` headers derive from it.
pub const GRENADES_PATH: &str = "/v1/grenades";
/// Optional precondition header for `PATCH`.
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";
/// Concurrent image lookups while enriching a listing.
const ENRICH_CONCURRENCY: usize = 8;

fn grenade_path(id: i32) -> String {
    format!("{GRENADES_PATH}/{id}")
}

#[utoipa::path(
    get,
    path = "/grenades",
    tag = "Grenades",
    operation_id = "listGrenades",
    summary = "List grenades",
    description = "Returns every grenade matching the optional `map`, `side` and `type` filters, \
        each with its images. Results may be served from the response cache.",
    params(ListGrenadesQuery),
    responses(
        (status = 200, description = "Matching grenades", body = GrenadeListEnvelope),
        (status = 422, description = "Invalid sort value", body = ValidationErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_grenades(
    State(state): State<AppState>,
    Query(query): Query<ListGrenadesQuery>,
) -> Result<JsonResponse, AppError> {
    let filters = Filters::new(
        query.sort.as_deref().unwrap_or("id"),
        GRENADE_SORT_SAFE_LIST,
    );
    let mut v = Validator::new();
    filters.validate(&mut v);
    v.into_result().map_err(AppError::Validation)?;

    let canonical = query
        .canonical()
        .map_err(|e| AppError::Internal(format!("failed to encode listing query: {e}")))?;
    let cache_key = format!("{GRENADES_PATH}?{canonical}");
    if let Some(body) = state.cache.get(&cache_key).await {
        debug!(key = %cache_key, "Cache hit");
        return Ok(JsonResponse::ok(body));
    }

    let filter = GrenadeFilter {
        map: query.map.as_deref().unwrap_or_default(),
        side: query.side.as_deref().unwrap_or_default(),
        grenade_type: query.grenade_type.as_deref().unwrap_or_default(),
    };
    let grenades = GrenadeRepository::new(&state.db)
        .list_filtered(filter, &filters)
        .await?;
    let grenades =
        attach_images(&state.db, grenades, &state.config.storage.public_base_url).await?;

    let body = encode("grenades", &grenades)?;
    state.cache.set(cache_key, body.clone(), DEFAULT_EXPIRATION).await;
    Ok(JsonResponse::ok(body))
}

#[utoipa::path(
    get,
    path = "/grenades/{id}",
    tag = "Grenades",
    operation_id = "getGrenade",
    summary = "Get a grenade with its images",
    params(("id" = i32, Path, description = "Grenade ID")),
    responses(
        (status = 200, description = "Grenade found", body = GrenadeEnvelope),
        (status = 404, description = "Grenade not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_grenade(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<JsonResponse, AppError> {
    let cache_key = grenade_path(id);
    if let Some(body) = state.cache.get(&cache_key).await {
        debug!(key = %cache_key, "Cache hit");
        return Ok(JsonResponse::ok(body));
    }

    let grenade = GrenadeRepository::new(&state.db).get(id).await?;
    let images = grenade_images(&state.db, id, &state.config.storage.public_base_url).await?;
    let response = GrenadeResponse::from(grenade).with_images(images);

    let body = encode("grenade", &response)?;
    state.cache.set(cache_key, body.clone(), DEFAULT_EXPIRATION).await;
    Ok(JsonResponse::ok(body))
}

#[utoipa::path(
    post,
    path = "/grenades",
    tag = "Grenades",
    operation_id = "createGrenade",
    summary = "Create a grenade",
    request_body = GrenadeInput,
    responses(
        (status = 201, description = "Grenade created", body = GrenadeEnvelope,
            headers(("Location" = String, description = "Path of the new grenade"))),
        (status = 400, description = "Malformed JSON body", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ValidationErrorBody),
    ),
)]
#[instrument(skip(state, input), fields(map = %input.map, grenade_type = %input.grenade_type))]
pub async fn create_grenade(
    State(state): State<AppState>,
    AppJson(input): AppJson<GrenadeInput>,
) -> Result<JsonResponse, AppError> {
    let mut v = Validator::new();
    validate_grenade(&mut v, &input);
    v.into_result().map_err(AppError::Validation)?;

    let grenade = GrenadeRepository::new(&state.db).insert(&input).await?;
    let location = HeaderValue::try_from(grenade_path(grenade.id))
        .map_err(|e| AppError::Internal(format!("invalid Location header: {e}")))?;

    let body = encode("grenade", &GrenadeResponse::from(grenade))?;
    Ok(JsonResponse::new(StatusCode::CREATED, body).with_header(header::LOCATION, location))
}

#[utoipa::path(
    patch,
    path = "/grenades/{id}",
    tag = "Grenades",
    operation_id = "updateGrenade",
    summary = "Partially update a grenade",
    description = "Only supplied, non-null fields are changed. The write succeeds only if the \
        grenade is still at the version that was read; send `X-Expected-Version` to pin it \
        to the version the client last saw.",
    params(
        ("id" = i32, Path, description = "Grenade ID"),
        ("X-Expected-Version" = Option<i32>, Header, description = "Reject with 409 unless the stored version matches"),
    ),
    request_body = UpdateGrenadeRequest,
    responses(
        (status = 200, description = "Grenade updated", body = GrenadeEnvelope),
        (status = 400, description = "Malformed JSON body or header", body = ErrorBody),
        (status = 404, description = "Grenade not found", body = ErrorBody),
        (status = 409, description = "Edit conflict", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ValidationErrorBody),
    ),
)]
#[instrument(skip(state, headers, patch))]
pub async fn update_grenade(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    headers: HeaderMap,
    AppJson(patch): AppJson<UpdateGrenadeRequest>,
) -> Result<JsonResponse, AppError> {
    let expected_version = expected_version(&headers)?;

    let repo = GrenadeRepository::new(&state.db);
    let current = repo.get(id).await?;
    if expected_version.is_some_and(|expected| expected != current.version) {
        return Err(AppError::EditConflict);
    }

    let mut input = GrenadeInput::from(&current);
    patch.merge_into(&mut input);

    let mut v = Validator::new();
    validate_grenade(&mut v, &input);
    v.into_result().map_err(AppError::Validation)?;

    let version = repo.update(id, current.version, &input).await?;
    let images = grenade_images(&state.db, id, &state.config.storage.public_base_url).await?;

    let body = encode(
        "grenade",
        &GrenadeResponse {
            id,
            map: input.map,
            title: input.title,
            description: input.description,
            grenade_type: input.grenade_type,
            side: input.side,
            version,
            images,
        },
    )?;
    Ok(JsonResponse::ok(body))
}

#[utoipa::path(
    delete,
    path = "/grenades/{id}",
    tag = "Grenades",
    operation_id = "deleteGrenade",
    summary = "Delete a grenade and its images",
    description = "Removes the stored image files first, then the image rows and the grenade \
        in one transaction.",
    params(("id" = i32, Path, description = "Grenade ID")),
    responses(
        (status = 200, description = "Grenade deleted", body = MessageEnvelope),
        (status = 404, description = "Grenade not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_grenade(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<JsonResponse, AppError> {
    GrenadeRepository::new(&state.db).get(id).await?;

    let images = ImageRepository::new(&state.db).by_grenade(id).await?;
    for image in &images {
        if !state.image_store.delete(&image.name).await? {
            warn!(object = %image.name, "Image object already missing from storage");
        }
    }

    let txn = state.db.begin().await?;
    let removed = ImageRepository::new(&txn).delete_by_grenade(id).await?;
    GrenadeRepository::new(&txn).delete(id).await?;
    txn.commit().await?;

    debug!(images = removed, "Grenade deleted");
    Ok(JsonResponse::ok(encode(
        "message",
        "grenade successfully deleted",
    )?))
}

fn expected_version(headers: &HeaderMap) -> Result<Option<i32>, AppError> {
    let Some(value) = headers.get(EXPECTED_VERSION_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .map(Some)
        .ok_or_else(|| AppError::BadRequest("X-Expected-Version header must be an integer".into()))
}

async fn grenade_images(
    db: &DatabaseConnection,
    grenade_id: i32,
    base_url: &str,
) -> Result<Vec<ImageResponse>, RepoError> {
    Ok(ImageRepository::new(db)
        .by_grenade(grenade_id)
        .await?
        .into_iter()
        .map(|m| ImageResponse::from_model(m, base_url))
        .collect())
}

/// Resolve every grenade's images concurrently, preserving listing order.
/// The first failing lookup aborts the whole listing.
async fn attach_images(
    db: &DatabaseConnection,
    grenades: Vec<grenade::Model>,
    base_url: &str,
) -> Result<Vec<GrenadeResponse>, RepoError> {
    let ids: Vec<i32> = grenades.iter().map(|g| g.id).collect();
    let images: Vec<Vec<ImageResponse>> = stream::iter(ids)
        .map(|id| async move { grenade_images(db, id, base_url).await })
        .buffered(ENRICH_CONCURRENCY)
        .try_collect()
        .await?;

    Ok(grenades
        .into_iter()
        .zip(images)
        .map(|(grenade, images)| GrenadeResponse::from(grenade).with_images(images))
        .collect())
}
