//! Razorpay-compatible payment gateway adapter.
//!
//! Remote orders are created over the REST API; authenticity of payments and
//! webhooks is established only by HMAC-SHA256 signatures:
//!
//! * payment signature: `hex(HMAC(key_secret, "{order_id}|{payment_id}"))`
//! * webhook signature: `hex(HMAC(webhook_secret, raw_body))`

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::{GatewayConfig, Secret};
use crate::domain::errors::DomainError;
use crate::domain::ports::{PaymentGateway, RemoteIntent, WebhookEvent};

type HmacSha256 = Hmac<Sha256>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Events that prove a payment for an order was captured.
const CAPTURE_EVENTS: [&str; 2] = ["payment.captured", "order.paid"];

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request to payment gateway failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected payment gateway response: {0}")]
    Malformed(String),
}

impl From<GatewayError> for DomainError {
    fn from(e: GatewayError) -> Self {
        DomainError::GatewayUnavailable(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderEntity {
    id: Option<String>,
    amount: Option<i64>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event: String,
    #[serde(default)]
    payload: EventPayload,
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    payment: Option<Wrapped<PaymentEntity>>,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
}

pub struct RazorpayGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: Secret<String>,
    webhook_secret: Secret<String>,
}

impl RazorpayGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }

    async fn post_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteIntent, GatewayError> {
        let response = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.reveal()))
            .json(&CreateOrderBody {
                amount: amount_minor,
                currency,
                receipt,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|e| e.error.description)
                .unwrap_or_else(|| "no description".to_string());
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        parse_order_response(&body, amount_minor, currency)
    }
}

/// A 2xx response is only trusted if it actually names the created order.
fn parse_order_response(
    body: &[u8],
    requested_amount: i64,
    requested_currency: &str,
) -> Result<RemoteIntent, GatewayError> {
    let entity: OrderEntity = serde_json::from_slice(body)
        .map_err(|e| GatewayError::Malformed(format!("invalid order body: {e}")))?;
    let intent_id = entity
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| GatewayError::Malformed("order id missing".to_string()))?;
    Ok(RemoteIntent {
        intent_id,
        amount: entity.amount.unwrap_or(requested_amount),
        currency: entity
            .currency
            .unwrap_or_else(|| requested_currency.to_string()),
    })
}

/// Constant-time comparison of a hex signature against the HMAC of `message`.
fn hmac_matches(secret: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&signature).is_ok()
}

/// Extracts the order/payment pair from a gateway webhook body. Unknown
/// event types are reported as [`WebhookEvent::Other`].
pub fn parse_webhook_event(raw_body: &[u8]) -> Result<WebhookEvent, DomainError> {
    let envelope: EventEnvelope = serde_json::from_slice(raw_body)
        .map_err(|e| DomainError::InvalidInput(format!("Invalid webhook payload: {e}")))?;

    if !CAPTURE_EVENTS.contains(&envelope.event.as_str()) {
        return Ok(WebhookEvent::Other {
            event_type: envelope.event,
        });
    }

    let payment = envelope.payload.payment.map(|p| p.entity).ok_or_else(|| {
        DomainError::InvalidInput(format!("{} event without payment entity", envelope.event))
    })?;
    let remote_order_id = payment
        .order_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            DomainError::InvalidInput(format!("{} event without order id", envelope.event))
        })?;

    Ok(WebhookEvent::PaymentCaptured {
        remote_order_id,
        remote_payment_id: payment.id,
    })
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn publishable_key(&self) -> &str {
        &self.key_id
    }

    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<RemoteIntent, DomainError> {
        debug!("Creating remote order for {amount_minor} {currency} ({receipt})");
        self.post_order(amount_minor, currency, receipt)
            .await
            .map_err(|e| {
                warn!("Remote order creation failed for {receipt}: {e}");
                DomainError::from(e)
            })
    }

    fn verify_payment_signature(&self, intent_id: &str, payment_id: &str, signature: &str) -> bool {
        let message = format!("{intent_id}|{payment_id}");
        hmac_matches(self.key_secret.reveal(), message.as_bytes(), signature)
    }

    fn verify_webhook_signature(&self, raw_body: &[u8], signature: &str) -> bool {
        hmac_matches(self.webhook_secret.reveal(), raw_body, signature)
    }

    fn parse_webhook_event(&self, raw_body: &[u8]) -> Result<WebhookEvent, DomainError> {
        parse_webhook_event(raw_body)
    }
}
