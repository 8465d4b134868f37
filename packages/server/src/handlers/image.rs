use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::error::{AppError, ErrorBody, ValidationErrorBody};
use crate::extractors::id::ResourceId;
use crate::models::envelope::{JsonResponse, encode};
use crate::models::image::*;
use crate::models::shared::MessageEnvelope;
use crate::repository::{GrenadeRepository, ImageRepository};
use crate::state::AppState;
use crate::validator::Validator;

/// Body limit for the upload route. Larger than the accepted image size so
/// oversize files reach validation and get a field-level error.
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(32 * 1024 * 1024)
}

struct UploadedFile {
    file_name: Option<String>,
    size: usize,
    bytes: Vec<u8>,
}

/// Hitting the route's body limit means the file is oversize; anything else is a malformed body.
fn read_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let mut v = Validator::new();
        validate_image_size(&mut v, usize::MAX);
        return AppError::Validation(v.into_errors());
    }
    AppError::BadRequest(format!("failed to read upload: {}", e.body_text()))
}

/// Read the `grenadeImage` field. Bytes past [`MAX_IMAGE_BYTES`] are counted but not kept.
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(read_error)?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let mut size = 0usize;
        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(read_error)?
        {
            size += chunk.len();
            if size < MAX_IMAGE_BYTES {
                bytes.extend_from_slice(&chunk);
            }
        }

        return Ok(Some(UploadedFile {
            file_name,
            size,
            bytes,
        }));
    }
    Ok(None)
}

#[utoipa::path(
    post,
    path = "/grenades/{id}/images",
    tag = "Images",
    operation_id = "uploadGrenadeImage",
    summary = "Attach an image to a grenade",
    description = "Accepts a `grenadeImage` multipart file (jpg, jpeg or png, under 20MB). \
        The file is stored under a generated name and linked to the grenade.",
    params(("id" = i32, Path, description = "Grenade ID")),
    request_body(content_type = "multipart/form-data", description = "Image file in the `grenadeImage` field"),
    responses(
        (status = 200, description = "Image stored", body = ImageEnvelope),
        (status = 400, description = "Malformed multipart body", body = ErrorBody),
        (status = 404, description = "Grenade not found", body = ErrorBody),
        (status = 422, description = "Unsupported size or extension", body = ValidationErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    ResourceId(grenade_id): ResourceId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<JsonResponse, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    GrenadeRepository::new(&state.db).get(grenade_id).await?;

    let upload = read_image_field(&mut multipart).await?.ok_or_else(|| {
        AppError::BadRequest(format!("multipart field \"{IMAGE_FIELD}\" is required"))
    })?;

    let extension = upload.file_name.as_deref().and_then(file_extension);
    let mut v = Validator::new();
    validate_image(&mut v, upload.size, extension.as_deref());
    v.into_result().map_err(AppError::Validation)?;

    let name = format!(
        "{}.{}",
        Utc::now().timestamp_micros(),
        extension.as_deref().unwrap_or_default()
    );
    state.image_store.put(&name, &upload.bytes).await?;

    let image = match ImageRepository::new(&state.db).insert(&name, grenade_id).await {
        Ok(image) => image,
        Err(e) => {
            if let Err(cleanup) = state.image_store.delete(&name).await {
                warn!(object = %name, error = %cleanup, "Failed to remove orphaned image object");
            }
            return Err(e.into());
        }
    };

    info!(image_id = image.id, object = %image.name, size = upload.size, "Image uploaded");
    let response = ImageResponse::from_model(image, &state.config.storage.public_base_url);
    Ok(JsonResponse::ok(encode("image", &response)?))
}

#[utoipa::path(
    get,
    path = "/images",
    tag = "Images",
    operation_id = "listImages",
    summary = "List all images",
    responses(
        (status = 200, description = "All stored images", body = ImageListEnvelope),
    ),
)]
#[instrument(skip(state))]
pub async fn list_images(State(state): State<AppState>) -> Result<JsonResponse, AppError> {
    let base_url = &state.config.storage.public_base_url;
    let images: Vec<ImageResponse> = ImageRepository::new(&state.db)
        .all()
        .await?
        .into_iter()
        .map(|m| ImageResponse::from_model(m, base_url))
        .collect();
    Ok(JsonResponse::ok(encode("images", &images)?))
}

#[utoipa::path(
    get,
    path = "/images/{id}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Get image metadata",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image found", body = ImageEnvelope),
        (status = 404, description = "Image not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<JsonResponse, AppError> {
    let image = ImageRepository::new(&state.db).get(id).await?;
    let response = ImageResponse::from_model(image, &state.config.storage.public_base_url);
    Ok(JsonResponse::ok(encode("image", &response)?))
}

#[utoipa::path(
    delete,
    path = "/images/{id}",
    tag = "Images",
    operation_id = "deleteImage",
    summary = "Delete an image",
    description = "Removes the stored file before the metadata row. If the file cannot be \
        removed the row is kept.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image deleted", body = MessageEnvelope),
        (status = 404, description = "Image not found", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<JsonResponse, AppError> {
    let repo = ImageRepository::new(&state.db);
    let image = repo.get(id).await?;

    if !state.image_store.delete(&image.name).await? {
        warn!(object = %image.name, "Image object already missing from storage");
    }
    repo.delete(id).await?;

    Ok(JsonResponse::ok(encode("message", "image successfully deleted")?))
}
