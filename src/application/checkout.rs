use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use log::{info, warn};
use uuid::Uuid;

use super::run_blocking;
use crate::domain::errors::DomainError;
use crate::domain::money::{line_total, to_minor_units};
use crate::domain::order::{LineItemRequest, NewOrder, OrderView, PricedLine, ShippingDetails};
use crate::domain::ports::{CartRepository, CatalogRepository, OrderRepository, PaymentGateway};

/// Width of `orders.phone`.
pub const MAX_PHONE_LEN: usize = 20;

/// `orders.total_amount` and `order_lines.unit_price` are `NUMERIC(10,2)`,
/// so every stored amount must stay below this bound.
const AMOUNT_UPPER_BOUND: i64 = 100_000_000;

/// Where the lines of a checkout come from.
#[derive(Debug, Clone)]
pub enum CheckoutSource {
    /// Lines sent by the client.
    Items(Vec<LineItemRequest>),
    /// The caller's server-side cart.
    Cart,
}

impl CheckoutSource {
    /// An empty item list falls back to the server-side cart.
    pub fn from_items(items: Option<Vec<LineItemRequest>>) -> Self {
        match items {
            Some(items) if !items.is_empty() => CheckoutSource::Items(items),
            _ => CheckoutSource::Cart,
        }
    }
}

/// Everything the client needs to complete payment with the gateway.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: OrderView,
    pub remote_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub key: String,
}

pub struct CheckoutService {
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
    ) -> Self {
        Self {
            catalog,
            carts,
            orders,
            gateway,
            currency,
        }
    }

    /// Creates a pending order and a remote payment intent for it.
    ///
    /// Nothing is written if a line cannot be resolved or is out of stock.
    /// Stock itself is only deducted when the payment is confirmed. If the
    /// gateway call fails the order stays persisted without a remote id and
    /// `GatewayUnavailable` is returned.
    pub async fn checkout(
        &self,
        user_id: Uuid,
        source: CheckoutSource,
        shipping: ShippingDetails,
    ) -> Result<CheckoutReceipt, DomainError> {
        validate_shipping(&shipping)?;
        let lines = self.price_lines(user_id, source).await?;
        let total = lines
            .iter()
            .fold(BigDecimal::from(0), |acc, l| acc + line_total(&l.unit_price, l.quantity));
        check_amount_fits(&total, "Order total")?;
        let amount_minor = to_minor_units(&total)?;

        let new_order = NewOrder {
            user_id,
            shipping_address: shipping.address_snapshot(),
            phone: shipping.phone,
            total_amount: total,
            lines,
        };
        let orders = Arc::clone(&self.orders);
        let carts = Arc::clone(&self.carts);
        let mut order = run_blocking(move || {
            let order = orders.create(new_order)?;
            carts.clear_cart(user_id)?;
            Ok(order)
        })
        .await?;
        info!(
            "Order {} created for user {} ({} line(s), total {})",
            order.id,
            user_id,
            order.lines.len(),
            order.total_amount
        );

        let receipt = format!("order_{}", order.id);
        let intent = match self
            .gateway
            .create_intent(amount_minor, &self.currency, &receipt)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                warn!("Order {} left without a remote payment intent: {}", order.id, e);
                return Err(e);
            }
        };

        let orders = Arc::clone(&self.orders);
        let (order_id, intent_id) = (order.id, intent.intent_id.clone());
        run_blocking(move || orders.attach_remote_order(order_id, &intent_id)).await?;
        order.remote_order_id = Some(intent.intent_id.clone());

        Ok(CheckoutReceipt {
            order,
            remote_order_id: intent.intent_id,
            amount_minor: intent.amount,
            currency: intent.currency,
            key: self.gateway.publishable_key().to_string(),
        })
    }

    async fn price_lines(
        &self,
        user_id: Uuid,
        source: CheckoutSource,
    ) -> Result<Vec<PricedLine>, DomainError> {
        let catalog = Arc::clone(&self.catalog);
        let carts = Arc::clone(&self.carts);
        run_blocking(move || match source {
            CheckoutSource::Items(items) => price_items(catalog.as_ref(), &items),
            CheckoutSource::Cart => price_cart(carts.as_ref(), user_id),
        })
        .await
    }
}

fn validate_shipping(shipping: &ShippingDetails) -> Result<(), DomainError> {
    if shipping.address.trim().is_empty() {
        return Err(DomainError::InvalidInput("Shipping address is required".to_string()));
    }
    if shipping.phone.chars().count() > MAX_PHONE_LEN {
        return Err(DomainError::InvalidInput(format!(
            "Phone number must be at most {MAX_PHONE_LEN} characters"
        )));
    }
    Ok(())
}

fn check_amount_fits(amount: &BigDecimal, what: &str) -> Result<(), DomainError> {
    if *amount >= BigDecimal::from(AMOUNT_UPPER_BOUND) {
        return Err(DomainError::InvalidInput(format!(
            "{what} {amount} exceeds the maximum of 99999999.99"
        )));
    }
    Ok(())
}

fn price_items(
    catalog: &dyn CatalogRepository,
    items: &[LineItemRequest],
) -> Result<Vec<PricedLine>, DomainError> {
    let mut requested: HashMap<Uuid, i32> = HashMap::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        if item.sku.trim().is_empty() || item.size.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "Each item must include 'sku' and 'size'".to_string(),
            ));
        }
        if item.quantity < 1 {
            return Err(DomainError::InvalidInput(format!(
                "Quantity for {} ({}) must be at least 1",
                item.sku, item.size
            )));
        }

        let variant = catalog.find_variant(&item.sku, &item.size)?.ok_or_else(|| {
            DomainError::NotFound(format!("Product variant {} ({}) not found", item.sku, item.size))
        })?;

        // The same variant may appear on several lines.
        let total_requested = requested.entry(variant.variant_id).or_default();
        match total_requested.checked_add(item.quantity) {
            Some(combined) if combined <= variant.stock => *total_requested = combined,
            _ => {
                return Err(DomainError::InsufficientStock {
                    product: variant.product_name,
                    size: variant.size,
                })
            }
        }
        check_amount_fits(&variant.unit_price, "Unit price")?;

        lines.push(PricedLine {
            variant_id: variant.variant_id,
            product_name: variant.product_name,
            size: variant.size,
            unit_price: variant.unit_price,
            quantity: item.quantity,
        });
    }
    Ok(lines)
}

fn price_cart(carts: &dyn CartRepository, user_id: Uuid) -> Result<Vec<PricedLine>, DomainError> {
    let cart = carts
        .find_cart(user_id)?
        .ok_or_else(|| DomainError::NotFound("No cart found for this user".to_string()))?;
    if cart.items.is_empty() {
        return Err(DomainError::InvalidInput("Cart is empty".to_string()));
    }

    cart.items
        .into_iter()
        .map(|item| {
            if item.variant.stock < item.quantity {
                return Err(DomainError::InsufficientStock {
                    product: item.variant.product_name,
                    size: item.variant.size,
                });
            }
            check_amount_fits(&item.variant.unit_price, "Unit price")?;
            Ok(PricedLine {
                variant_id: item.variant.variant_id,
                product_name: item.variant.product_name,
                size: item.variant.size,
                unit_price: item.variant.unit_price,
                quantity: item.quantity,
            })
        })
        .collect()
}
