use std::future::Future;
use std::time::Duration;

use sea_orm::DbErr;
use thiserror::Error;

use crate::models::filters::FilterError;

pub mod grenade;
pub mod image;

pub use grenade::GrenadeRepository;
pub use image::ImageRepository;

/// Deadline for a single data operation.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,
    #[error("edit conflict")]
    EditConflict,
    #[error("database operation exceeded {}s", QUERY_TIMEOUT.as_secs())]
    Timeout,
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Run a database future under [`QUERY_TIMEOUT`].
async fn bounded<T, F>(fut: F) -> Result<T, RepoError>
where
    F: Future<Output = Result<T, DbErr>>,
{
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(RepoError::Timeout),
    }
}
