use std::sync::Arc;

use sea_orm::DatabaseConnection;
use storage::filesystem::FilesystemImageStore;
use storage::s3::{S3ImageStore, S3Settings};
use storage::{ImageStore, StorageError};
use tracing::info;

use crate::cache::ResponseCache;
use crate::config::{AppConfig, StorageBackend, StorageConfig};
use crate::models::image::MAX_IMAGE_BYTES;

/// Dependencies shared by every request handler, injected once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub image_store: Arc<dyn ImageStore>,
    pub cache: Arc<ResponseCache>,
    pub config: AppConfig,
}

/// Construct the configured image storage backend.
pub async fn build_image_store(
    config: &StorageConfig,
) -> Result<Arc<dyn ImageStore>, StorageError> {
    let max_size = MAX_IMAGE_BYTES as u64;
    match config.backend {
        StorageBackend::Filesystem => {
            let store = FilesystemImageStore::new(config.images_dir.clone(), max_size).await?;
            info!(dir = %config.images_dir.display(), "Using filesystem image storage");
            Ok(Arc::new(store))
        }
        StorageBackend::S3 => {
            let s3 = config.s3.as_ref().ok_or_else(|| {
                StorageError::Backend("storage.s3 must be set when storage.backend = \"s3\"".into())
            })?;
            let settings = S3Settings {
                endpoint: s3.endpoint.clone(),
                region: s3.region.clone(),
                bucket: s3.bucket.clone(),
                access_key: s3.access_key.clone(),
                secret_key: s3.secret_key.clone(),
                path_style: s3.path_style,
            };
            let store = S3ImageStore::new(&settings, max_size)?;
            info!(bucket = %s3.bucket, endpoint = %s3.endpoint, "Using S3 image storage");
            Ok(Arc::new(store))
        }
    }
}
