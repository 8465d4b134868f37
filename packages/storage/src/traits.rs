use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Name-addressed storage for image bytes.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store bytes under `name`, replacing any previous object.
    async fn put(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(name, reader).await.map(|_| ())
    }

    /// Store data from an async reader and return the number of bytes written.
    async fn put_stream(&self, name: &str, reader: BoxReader) -> Result<u64, StorageError>;

    /// Retrieve all bytes for an object.
    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(name).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, name: &str) -> Result<BoxReader, StorageError>;

    /// Check whether an object exists.
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Delete an object by name.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;
}

/// Reject names that are empty, contain a path separator, or are dot-only.
pub fn validate_object_name(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.chars().all(|c| c == '.');
    if bad {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
