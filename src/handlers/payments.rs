use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::confirmation::{
    ClientVerification, PaymentConfirmationService, WebhookOutcome,
};
use crate::domain::caller::Caller;
use crate::domain::order::Confirmation;
use crate::errors::AppError;

/// Name of the header carrying the webhook signature.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub signature_header: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(default, alias = "razorpay_order_id")]
    pub remote_order_id: Option<String>,
    #[serde(default, alias = "razorpay_payment_id")]
    pub remote_payment_id: Option<String>,
    #[serde(default, alias = "razorpay_signature")]
    pub signature: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub order_id: Uuid,
}

impl From<Confirmation> for VerifyPaymentResponse {
    fn from(c: Confirmation) -> Self {
        let message = match c {
            Confirmation::Applied { .. } => "Payment verified and stock updated",
            Confirmation::AlreadyPaid { .. } => "Payment already verified",
        };
        Self {
            success: true,
            message: message.to_string(),
            order_id: c.order_id(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    /// `processed`, `ignored` or `fulfillment_exception`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<WebhookOutcome> for WebhookResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Confirmed(c) => Self {
                status: "processed".to_string(),
                order_id: Some(c.order_id()),
                reason: None,
            },
            WebhookOutcome::Ignored { reason } => Self {
                status: "ignored".to_string(),
                order_id: None,
                reason: Some(reason),
            },
            WebhookOutcome::FulfillmentException { order_id, reason } => Self {
                status: "fulfillment_exception".to_string(),
                order_id: Some(order_id),
                reason: Some(reason),
            },
        }
    }
}

/// POST /payments/verify
///
/// Client-side confirmation after the gateway widget reports success.
/// Repeating it for a paid order succeeds without touching stock again.
#[utoipa::path(
    post,
    path = "/payments/verify",
    request_body = VerifyPaymentRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 200, description = "Order is paid", body = VerifyPaymentResponse),
        (status = 400, description = "Missing details or invalid signature"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Paid but stock cannot cover the order"),
    ),
    tag = "payments"
)]
pub async fn verify_payment(
    caller: Caller,
    service: web::Data<PaymentConfirmationService>,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let confirmation = service
        .confirm_from_client(
            caller.user_id,
            ClientVerification {
                remote_order_id: body.remote_order_id,
                remote_payment_id: body.remote_payment_id,
                signature: body.signature,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(VerifyPaymentResponse::from(confirmation)))
}

/// POST /payments/webhook
///
/// Gateway push. The signature header is checked against the raw body, so
/// the body is taken as bytes and never re-serialized.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body(
        content = String,
        description = "Raw gateway event",
        content_type = "application/json"
    ),
    params((
        "X-Signature" = String,
        Header,
        description = "hex HMAC-SHA256 of the body; header name is configurable"
    )),
    responses(
        (
            status = 200,
            description = "Processed, ignored, or acknowledged as a fulfillment exception",
            body = WebhookResponse
        ),
        (status = 400, description = "Invalid signature or payload"),
    ),
    tag = "payments"
)]
pub async fn payment_webhook(
    req: HttpRequest,
    body: web::Bytes,
    settings: web::Data<WebhookSettings>,
    service: web::Data<PaymentConfirmationService>,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(settings.signature_header.as_str())
        .and_then(|v| v.to_str().ok());
    debug!("Webhook received ({} bytes)", body.len());

    let outcome = service.confirm_from_webhook(&body, signature).await?;
    Ok(HttpResponse::Ok().json(WebhookResponse::from(outcome)))
}
