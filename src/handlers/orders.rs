use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::checkout::{CheckoutReceipt, CheckoutService, CheckoutSource};
use crate::application::order_service::OrderService;
use crate::domain::caller::Caller;
use crate::domain::order::{
    LineItemRequest, OrderLineView, OrderStatus, OrderView, PaymentStatus, ShippingDetails,
};
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutItemRequest {
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub size: String,
    /// Defaults to 1.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Lines to buy. When absent or empty the caller's cart is checked out.
    #[serde(default)]
    pub items: Option<Vec<CheckoutItemRequest>>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub apartment: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub phone: String,
}

impl CheckoutRequest {
    fn into_parts(self) -> (CheckoutSource, ShippingDetails) {
        let items = self.items.map(|items| {
            items
                .into_iter()
                .map(|i| LineItemRequest {
                    sku: i.sku,
                    size: i.size,
                    quantity: i.quantity,
                })
                .collect()
        });
        let shipping = ShippingDetails {
            address: self.address,
            apartment: self.apartment,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country,
            phone: self.phone,
        };
        (CheckoutSource::from_items(items), shipping)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub id: Uuid,
    pub remote_order_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Publishable gateway key for the client widget.
    pub key: String,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

impl From<CheckoutReceipt> for CheckoutResponse {
    fn from(r: CheckoutReceipt) -> Self {
        Self {
            id: r.order.id,
            remote_order_id: r.remote_order_id,
            amount: r.amount_minor,
            currency: r.currency,
            key: r.key,
            order_status: r.order.order_status,
            payment_status: r.order.payment_status,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLineResponse {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub product_name: String,
    pub variant_label: String,
    /// Decimal string, e.g. "499.50".
    pub unit_price: String,
    pub quantity: i32,
}

impl From<OrderLineView> for OrderLineResponse {
    fn from(l: OrderLineView) -> Self {
        Self {
            id: l.id,
            variant_id: l.variant_id,
            product_name: l.product_name,
            variant_label: l.variant_label,
            unit_price: l.unit_price.to_string(),
            quantity: l.quantity,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub shipping_address: String,
    pub phone: String,
    pub total_amount: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub remote_order_id: Option<String>,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            id: o.id,
            shipping_address: o.shipping_address,
            phone: o.phone,
            total_amount: o.total_amount.to_string(),
            payment_status: o.payment_status,
            order_status: o.order_status,
            remote_order_id: o.remote_order_id,
            created_at: o.created_at.to_rfc3339(),
            lines: o.lines.into_iter().map(OrderLineResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusResponse {
    pub order_id: Uuid,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
}

impl From<OrderView> for OrderStatusResponse {
    fn from(o: OrderView) -> Self {
        Self {
            order_id: o.id,
            payment_status: o.payment_status,
            order_status: o.order_status,
            remote_order_id: o.remote_order_id,
            remote_payment_id: o.remote_payment_id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of Processing, Paid, Shipped, Delivered, Cancelled.
    #[serde(alias = "status")]
    pub order_status: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /checkout
///
/// Creates a pending order from the submitted items (or the caller's cart)
/// and a remote payment intent for its total. Stock is not deducted here.
#[utoipa::path(
    post,
    path = "/checkout",
    request_body = CheckoutRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 201, description = "Order created, awaiting payment", body = CheckoutResponse),
        (status = 400, description = "Invalid items or shipping details, or empty cart"),
        (status = 401, description = "Missing caller identity"),
        (status = 404, description = "Unknown variant or no cart"),
        (status = 502, description = "Payment gateway unavailable"),
    ),
    tag = "orders"
)]
pub async fn checkout(
    caller: Caller,
    service: web::Data<CheckoutService>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let (source, shipping) = body.into_inner().into_parts();
    let receipt = service.checkout(caller.user_id, source, shipping).await?;
    Ok(HttpResponse::Created().json(CheckoutResponse::from(receipt)))
}

/// GET /orders
///
/// The caller's orders with their lines, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(("X-User-Id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 200, description = "Order history", body = Vec<OrderResponse>),
        (status = 401, description = "Missing caller identity"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    caller: Caller,
    service: web::Data<OrderService>,
) -> Result<HttpResponse, AppError> {
    let orders: Vec<OrderResponse> = service
        .list(caller.user_id)
        .await?
        .into_iter()
        .map(OrderResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(orders))
}

/// GET /orders/{id}/status
#[utoipa::path(
    get,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user"),
    ),
    responses(
        (
            status = 200,
            description = "Current payment and fulfilment state",
            body = OrderStatusResponse
        ),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn order_status(
    caller: Caller,
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = service.status(caller.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}

/// PATCH /orders/{id}/status
///
/// Staff-only. The order must already be paid.
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    request_body = UpdateOrderStatusRequest,
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user"),
        ("X-User-Role" = String, Header, description = "Must be `staff`"),
    ),
    responses(
        (status = 200, description = "Status updated", body = OrderStatusResponse),
        (status = 400, description = "Order not paid or unknown status"),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    caller: Caller,
    service: web::Data<OrderService>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let order = service
        .update_status(&caller, path.into_inner(), &body.order_status)
        .await?;
    Ok(HttpResponse::Ok().json(OrderStatusResponse::from(order)))
}
