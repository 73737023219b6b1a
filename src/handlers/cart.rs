use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::cart_service::CartService;
use crate::domain::caller::Caller;
use crate::domain::money::line_total;
use crate::domain::order::{CartLine, CartView};
use crate::errors::AppError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub variant_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub product_name: String,
    pub size: String,
    /// Live price; cart lines are not snapshotted.
    pub unit_price: String,
    pub quantity: i32,
    pub line_total: String,
}

impl From<&CartLine> for CartItemResponse {
    fn from(item: &CartLine) -> Self {
        Self {
            id: item.item_id,
            variant_id: item.variant.variant_id,
            product_name: item.variant.product_name.clone(),
            size: item.variant.size.clone(),
            unit_price: item.variant.unit_price.to_string(),
            quantity: item.quantity,
            line_total: line_total(&item.variant.unit_price, item.quantity).to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub total: String,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        let total = cart.items.iter().fold(BigDecimal::from(0), |acc, item| {
            acc + line_total(&item.variant.unit_price, item.quantity)
        });
        Self {
            id: cart.cart_id,
            items: cart.items.iter().map(CartItemResponse::from).collect(),
            total: total.to_string(),
        }
    }
}

/// GET /cart
#[utoipa::path(
    get,
    path = "/cart",
    params(("X-User-Id" = Uuid, Header, description = "Authenticated user")),
    responses((status = 200, description = "The caller's cart", body = CartResponse)),
    tag = "cart"
)]
pub async fn get_cart(
    caller: Caller,
    service: web::Data<CartService>,
) -> Result<HttpResponse, AppError> {
    let cart = service.view(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/items
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddCartItemRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated user")),
    responses(
        (status = 201, description = "Item added", body = CartResponse),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 404, description = "Unknown variant"),
    ),
    tag = "cart"
)]
pub async fn add_cart_item(
    caller: Caller,
    service: web::Data<CartService>,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let cart = service
        .add(caller.user_id, body.variant_id, body.quantity)
        .await?;
    Ok(HttpResponse::Created().json(CartResponse::from(cart)))
}

/// DELETE /cart/items/{id}
#[utoipa::path(
    delete,
    path = "/cart/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart item UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated user"),
    ),
    responses(
        (status = 200, description = "Item removed", body = CartResponse),
        (status = 404, description = "Cart item not found"),
    ),
    tag = "cart"
)]
pub async fn remove_cart_item(
    caller: Caller,
    service: web::Data<CartService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let cart = service.remove(caller.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
