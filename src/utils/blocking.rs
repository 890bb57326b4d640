//! Runs CPU-bound work (bcrypt hashing and verification) on tokio's
//! blocking pool instead of the actix workers.

use crate::utils::error::AppError;

pub async fn spawn_crypto_blocking<F, R>(f: F) -> Result<R, AppError>
where
    F: FnOnce() -> Result<R, AppError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}
