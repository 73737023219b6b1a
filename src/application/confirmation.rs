use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use super::run_blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{Confirmation, IntentLookup, PaymentProof};
use crate::domain::ports::{OrderRepository, PaymentGateway, WebhookEvent};

/// Payment details posted by the client after the gateway's checkout widget
/// reports success. Fields are optional so a partial body can be rejected
/// with a precise message instead of a deserialization error.
#[derive(Debug, Clone, Default)]
pub struct ClientVerification {
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Confirmed(Confirmation),
    /// Authentic event that does not confirm any order we know of.
    Ignored { reason: String },
    /// Paid order that stock cannot cover. Acknowledged so the gateway does
    /// not redeliver; the order stays pending for manual follow-up.
    FulfillmentException { order_id: Uuid, reason: String },
}

/// Converges client verification and gateway webhooks on the single
/// `confirm_payment` transition of the order repository.
pub struct PaymentConfirmationService {
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

fn required(value: Option<String>) -> Result<String, DomainError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DomainError::InvalidInput("Missing payment details".to_string()))
}

impl PaymentConfirmationService {
    pub fn new(orders: Arc<dyn OrderRepository>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { orders, gateway }
    }

    /// Confirms one of the caller's orders. The signature is checked before
    /// any state is read; orders of other users are reported as not found.
    pub async fn confirm_from_client(
        &self,
        user_id: Uuid,
        request: ClientVerification,
    ) -> Result<Confirmation, DomainError> {
        let remote_order_id = required(request.remote_order_id)?;
        let remote_payment_id = required(request.remote_payment_id)?;
        let signature = required(request.signature)?;

        if !self
            .gateway
            .verify_payment_signature(&remote_order_id, &remote_payment_id, &signature)
        {
            warn!(
                "Rejected payment signature for remote order {remote_order_id} from user {user_id}"
            );
            return Err(DomainError::InvalidSignature);
        }

        self.apply(
            IntentLookup {
                remote_order_id,
                owner: Some(user_id),
            },
            PaymentProof {
                remote_payment_id,
                signature,
            },
        )
        .await
    }

    /// Handles a gateway push. The body is authenticated byte-for-byte before
    /// it is parsed.
    pub async fn confirm_from_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, DomainError> {
        let Some(signature) = signature.filter(|s| !s.is_empty()) else {
            warn!("Webhook rejected: signature header missing");
            return Err(DomainError::InvalidSignature);
        };
        if !self.gateway.verify_webhook_signature(raw_body, signature) {
            warn!("Webhook rejected: signature mismatch");
            return Err(DomainError::InvalidSignature);
        }

        let event = self.gateway.parse_webhook_event(raw_body)?;
        let (remote_order_id, remote_payment_id) = match event {
            WebhookEvent::PaymentCaptured {
                remote_order_id,
                remote_payment_id,
            } => (remote_order_id, remote_payment_id),
            WebhookEvent::Other { event_type } => {
                info!("Ignoring webhook event {event_type}");
                return Ok(WebhookOutcome::Ignored {
                    reason: format!("event {event_type} not handled"),
                });
            }
        };

        let result = self
            .apply(
                IntentLookup {
                    remote_order_id: remote_order_id.clone(),
                    owner: None,
                },
                PaymentProof {
                    remote_payment_id,
                    signature: signature.to_string(),
                },
            )
            .await;

        match result {
            Ok(confirmation) => Ok(WebhookOutcome::Confirmed(confirmation)),
            // Redelivering will not make the order appear.
            Err(DomainError::NotFound(_)) => {
                warn!("Webhook for unknown remote order {remote_order_id} ignored");
                Ok(WebhookOutcome::Ignored {
                    reason: format!("no order for {remote_order_id}"),
                })
            }
            // Already error-logged by `apply`; a retry would fail the same way.
            Err(DomainError::FulfillmentException {
                order_id,
                product,
                size,
            }) => Ok(WebhookOutcome::FulfillmentException {
                order_id,
                reason: format!("stock for {product} ({size}) is insufficient"),
            }),
            Err(e) => Err(e),
        }
    }

    async fn apply(
        &self,
        lookup: IntentLookup,
        proof: PaymentProof,
    ) -> Result<Confirmation, DomainError> {
        let orders = Arc::clone(&self.orders);
        let remote_order_id = lookup.remote_order_id.clone();
        let result = run_blocking(move || orders.confirm_payment(&lookup, &proof)).await;

        match &result {
            Ok(Confirmation::Applied { order_id }) => {
                info!("Order {order_id} paid via remote order {remote_order_id}");
            }
            Ok(Confirmation::AlreadyPaid { order_id }) => {
                info!(
                    "Order {order_id} already paid, confirmation for {remote_order_id} is a no-op"
                );
            }
            Err(e @ DomainError::FulfillmentException { .. }) => {
                error!("Fulfillment exception for remote order {remote_order_id}: {e}");
            }
            Err(_) => {}
        }
        result
    }
}
