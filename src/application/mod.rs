pub mod cart_service;
pub mod checkout;
pub mod confirmation;
pub mod order_service;

use crate::domain::errors::DomainError;

/// Runs blocking repository work off the async executor.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {e}")))?
}
