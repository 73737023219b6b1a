use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not enough stock for {product} ({size})")]
    InsufficientStock { product: String, size: String },
    #[error("Payment signature verification failed")]
    InvalidSignature,
    #[error("Permission denied. {0}")]
    Forbidden(String),
    #[error("Order status conflict: {0}")]
    StatusConflict(String),
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    /// Payment was captured but stock can no longer cover the order.
    #[error("Order {order_id} was paid but stock for {product} ({size}) is insufficient")]
    FulfillmentException { order_id: Uuid, product: String, size: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(what: &str) -> Self {
        DomainError::NotFound(format!("{what} not found"))
    }
}
