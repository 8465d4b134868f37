use std::io::Cursor;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::{Bucket, Region};
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::error::StorageError;
use super::traits::{BoxReader, ImageStore, validate_object_name};

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    /// Falls back to the standard AWS environment/profile chain when `None`.
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Required by most self-hosted stores (MinIO, Selectel, ...).
    pub path_style: bool,
}

/// Image store backed by an S3-compatible object store.
pub struct S3ImageStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

impl S3ImageStore {
    pub fn new(settings: &S3Settings, max_size: u64) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
        };
        let credentials = Credentials::new(
            settings.access_key.as_deref(),
            settings.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&settings.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if settings.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket, max_size })
    }
}

fn check_status(name: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(name.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for object {name}"
        ))),
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put_stream(&self, name: &str, mut reader: BoxReader) -> Result<u64, StorageError> {
        validate_object_name(name)?;

        let mut data = Vec::new();
        let mut limited = (&mut reader).take(self.max_size + 1);
        limited.read_to_end(&mut data).await?;
        let size = data.len() as u64;
        if size > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: size,
                limit: self.max_size,
            });
        }

        let content_type = mime_guess::from_path(name).first_or_octet_stream();
        let response = self
            .bucket
            .put_object_with_content_type(name, &data, content_type.as_ref())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status(name, response.status_code())?;

        debug!(object = name, size, "Uploaded object");
        Ok(size)
    }

    async fn get_stream(&self, name: &str) -> Result<BoxReader, StorageError> {
        validate_object_name(name)?;
        let response = self
            .bucket
            .get_object(name)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        check_status(name, response.status_code())?;
        Ok(Box::new(Cursor::new(response.bytes().to_vec())))
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        validate_object_name(name)?;
        let (_, status) = self
            .bucket
            .head_object(name)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        match check_status(name, status) {
            Ok(()) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// S3 deletes are idempotent and do not report whether the key existed,
    /// so a successful call always yields `true`.
    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        validate_object_name(name)?;
        let response = self
            .bucket
            .delete_object(name)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        match check_status(name, response.status_code()) {
            Ok(()) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
