use std::path::Path;

use serde::Serialize;

use crate::entity::image;
use crate::validator::{Validator, permitted};

/// Name of the multipart field carrying the uploaded file.
pub const IMAGE_FIELD: &str = "grenadeImage";
/// Uploads must be strictly smaller than this many bytes.
pub const MAX_IMAGE_BYTES: usize = 20_000_000;
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ImageResponse {
    pub id: i32,
    #[schema(example = "1718000000000000.png")]
    pub name: String,
    #[schema(example = "http://localhost:4000/v1/image/1718000000000000.png")]
    pub image_url: String,
}

impl ImageResponse {
    pub fn from_model(m: image::Model, base_url: &str) -> Self {
        Self {
            image_url: image_url(base_url, &m.name),
            id: m.id,
            name: m.name,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageEnvelope {
    pub image: ImageResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageListEnvelope {
    pub images: Vec<ImageResponse>,
}

/// Public URL of a stored object. Independent of the address the server listens on.
pub fn image_url(base_url: &str, name: &str) -> String {
    format!("{base_url}{name}")
}

/// Lowercased final extension of an uploaded file name.
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

pub fn validate_image_size(v: &mut Validator, size: usize) {
    v.check(
        size < MAX_IMAGE_BYTES,
        "grenadeImage_size",
        "file size must be less than 20MB",
    );
}

pub fn validate_image(v: &mut Validator, size: usize, extension: Option<&str>) {
    validate_image_size(v, size);
    v.check(
        extension.is_some_and(|ext| permitted(ext, IMAGE_EXTENSIONS)),
        "grenadeImage_extension",
        "file extension must be jpeg|jpg|png",
    );
}
