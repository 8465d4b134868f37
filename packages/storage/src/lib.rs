//! Byte storage for uploaded grenade images.
//!
//! Objects are addressed by a flat, server-generated name. The API layer only
//! ever needs to write, read back and delete by that name.

mod error;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use error::StorageError;
pub use traits::{BoxReader, ImageStore, validate_object_name};
