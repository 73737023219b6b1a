use async_trait::async_trait;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{
    CartView, Confirmation, IntentLookup, NewOrder, OrderStatus, OrderView, PaymentProof,
    VariantSnapshot,
};

/// Read-only view of the product catalog.
pub trait CatalogRepository: Send + Sync + 'static {
    fn find_variant(&self, sku: &str, size: &str) -> Result<Option<VariantSnapshot>, DomainError>;
    fn find_variant_by_id(&self, variant_id: Uuid) -> Result<Option<VariantSnapshot>, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    /// `None` when the user has never had a cart.
    fn find_cart(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError>;
    fn get_or_create_cart(&self, user_id: Uuid) -> Result<CartView, DomainError>;
    /// Adds `quantity` to the cart line for `variant_id`, creating it if needed.
    fn add_item(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError>;
    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError>;
    /// Empties the user's cart. A missing cart is not an error.
    fn clear_cart(&self, user_id: Uuid) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Writes the order and all its lines atomically.
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError>;
    fn attach_remote_order(&self, order_id: Uuid, remote_order_id: &str) -> Result<(), DomainError>;
    fn find_for_user(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrderView>, DomainError>;
    fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError>;
    fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderView, DomainError>;
    /// The single "mark paid and deduct stock" transition. Runs in one
    /// transaction holding the order row lock and the locks of every variant
    /// it touches; a second call for the same order is a no-op.
    fn confirm_payment(
        &self,
        lookup: &IntentLookup,
        proof: &PaymentProof,
    ) -> Result<Confirmation, DomainError>;
}

/// A payment intent created on the gateway side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteIntent {
    pub intent_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
}

/// A webhook event, reduced to what confirmation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentCaptured {
        remote_order_id: String,
        remote_payment_id: String,
    },
    Other {
        event_type: String,
    },
}

/// Boundary to the external payment gateway. Implementations hold their own
/// credentials and report every transport or decoding failure as
/// `DomainError::GatewayUnavailable`.
#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Key the client needs to open the gateway's checkout widget.
    fn publishable_key(&self) -> &str;

    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteIntent, DomainError>;

    fn verify_payment_signature(&self, intent_id: &str, payment_id: &str, signature: &str) -> bool;

    /// Checks `signature` against the raw request body using the shared webhook secret.
    fn verify_webhook_signature(&self, raw_body: &[u8], signature: &str) -> bool;

    /// Decodes an already authenticated webhook body.
    fn parse_webhook_event(&self, raw_body: &[u8]) -> Result<WebhookEvent, DomainError>;
}
