//! In-memory implementations of the repository ports and the payment gateway
//! for service and handler tests.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    CartLine, CartView, Confirmation, IntentLookup, NewOrder, OrderLineView, OrderStatus,
    OrderView, PaymentProof, PaymentStatus, VariantSnapshot,
};
use crate::domain::ports::{
    CartRepository, CatalogRepository, OrderRepository, PaymentGateway, RemoteIntent, WebhookEvent,
};
use crate::infrastructure::razorpay;

struct StoredVariant {
    sku: String,
    product_name: String,
    size: String,
    unit_price: BigDecimal,
    stock: i32,
}

struct StoredCart {
    id: Uuid,
    /// (item id, variant id, quantity)
    items: Vec<(Uuid, Uuid, i32)>,
}

#[derive(Default)]
struct State {
    variants: BTreeMap<Uuid, StoredVariant>,
    carts: HashMap<Uuid, StoredCart>,
    orders: Vec<OrderView>,
}

/// Single-mutex store: every call is serialised, which stands in for the row
/// locks of the real repository.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

fn snapshot(id: Uuid, v: &StoredVariant) -> VariantSnapshot {
    VariantSnapshot {
        variant_id: id,
        product_name: v.product_name.clone(),
        size: v.size.clone(),
        unit_price: v.unit_price.clone(),
        stock: v.stock,
    }
}

fn cart_view(state: &State, cart: &StoredCart) -> CartView {
    CartView {
        cart_id: cart.id,
        items: cart
            .items
            .iter()
            .filter_map(|(item_id, variant_id, quantity)| {
                state.variants.get(variant_id).map(|v| CartLine {
                    item_id: *item_id,
                    variant: snapshot(*variant_id, v),
                    quantity: *quantity,
                })
            })
            .collect(),
    }
}

impl InMemoryStore {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store lock poisoned")
    }

    pub fn add_variant(&self, sku: &str, size: &str, price: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().variants.insert(
            id,
            StoredVariant {
                sku: sku.to_string(),
                product_name: format!("Product {sku}"),
                size: size.to_string(),
                unit_price: BigDecimal::from_str(price).expect("valid price"),
                stock,
            },
        );
        id
    }

    pub fn stock(&self, variant_id: Uuid) -> i32 {
        self.lock().variants[&variant_id].stock
    }

    pub fn set_stock(&self, variant_id: Uuid, stock: i32) {
        if let Some(v) = self.lock().variants.get_mut(&variant_id) {
            v.stock = stock;
        }
    }

    pub fn set_price(&self, variant_id: Uuid, price: &str) {
        if let Some(v) = self.lock().variants.get_mut(&variant_id) {
            v.unit_price = BigDecimal::from_str(price).expect("valid price");
        }
    }

    pub fn order(&self, order_id: Uuid) -> Option<OrderView> {
        self.lock().orders.iter().find(|o| o.id == order_id).cloned()
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn all_orders(&self) -> Vec<OrderView> {
        self.lock().orders.clone()
    }

    /// Inserts an order as if checkout had already run.
    pub fn seed_order(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
        remote_order_id: &str,
    ) -> Uuid {
        let mut state = self.lock();
        let v = &state.variants[&variant_id];
        let order = OrderView {
            id: Uuid::new_v4(),
            user_id,
            shipping_address: "1 Test Street".to_string(),
            phone: "5550100".to_string(),
            total_amount: &v.unit_price * BigDecimal::from(quantity),
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            remote_order_id: Some(remote_order_id.to_string()),
            remote_payment_id: None,
            created_at: Utc::now(),
            lines: vec![OrderLineView {
                id: Uuid::new_v4(),
                variant_id,
                product_name: v.product_name.clone(),
                variant_label: format!("Size: {}", v.size),
                unit_price: v.unit_price.clone(),
                quantity,
            }],
        };
        let id = order.id;
        state.orders.push(order);
        id
    }
}

impl CatalogRepository for InMemoryStore {
    fn find_variant(&self, sku: &str, size: &str) -> Result<Option<VariantSnapshot>, DomainError> {
        Ok(self
            .lock()
            .variants
            .iter()
            .find(|(_, v)| v.sku == sku && v.size == size)
            .map(|(id, v)| snapshot(*id, v)))
    }

    fn find_variant_by_id(&self, variant_id: Uuid) -> Result<Option<VariantSnapshot>, DomainError> {
        Ok(self.lock().variants.get(&variant_id).map(|v| snapshot(variant_id, v)))
    }
}

impl CartRepository for InMemoryStore {
    fn find_cart(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let state = self.lock();
        Ok(state.carts.get(&user_id).map(|c| cart_view(&state, c)))
    }

    fn get_or_create_cart(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let mut state = self.lock();
        state.carts.entry(user_id).or_insert_with(|| StoredCart {
            id: Uuid::new_v4(),
            items: Vec::new(),
        });
        Ok(cart_view(&state, &state.carts[&user_id]))
    }

    fn add_item(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        let mut state = self.lock();
        let cart = state.carts.entry(user_id).or_insert_with(|| StoredCart {
            id: Uuid::new_v4(),
            items: Vec::new(),
        });
        match cart.items.iter_mut().find(|(_, v, _)| *v == variant_id) {
            Some(item) => item.2 += quantity,
            None => cart.items.push((Uuid::new_v4(), variant_id, quantity)),
        }
        Ok(cart_view(&state, &state.carts[&user_id]))
    }

    fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let mut state = self.lock();
        let cart = state
            .carts
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::not_found("Cart item"))?;
        let before = cart.items.len();
        cart.items.retain(|(id, _, _)| *id != item_id);
        if cart.items.len() == before {
            return Err(DomainError::not_found("Cart item"));
        }
        Ok(cart_view(&state, &state.carts[&user_id]))
    }

    fn clear_cart(&self, user_id: Uuid) -> Result<(), DomainError> {
        if let Some(cart) = self.lock().carts.get_mut(&user_id) {
            cart.items.clear();
        }
        Ok(())
    }
}

impl OrderRepository for InMemoryStore {
    fn create(&self, order: NewOrder) -> Result<OrderView, DomainError> {
        let view = OrderView {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            shipping_address: order.shipping_address,
            phone: order.phone,
            total_amount: order.total_amount,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Processing,
            remote_order_id: None,
            remote_payment_id: None,
            created_at: Utc::now(),
            lines: order
                .lines
                .iter()
                .map(|l| OrderLineView {
                    id: Uuid::new_v4(),
                    variant_id: l.variant_id,
                    product_name: l.product_name.clone(),
                    variant_label: l.variant_label(),
                    unit_price: l.unit_price.clone(),
                    quantity: l.quantity,
                })
                .collect(),
        };
        self.lock().orders.push(view.clone());
        Ok(view)
    }

    fn attach_remote_order(
        &self,
        order_id: Uuid,
        remote_order_id: &str,
    ) -> Result<(), DomainError> {
        let mut state = self.lock();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| DomainError::not_found("Order"))?;
        order.remote_order_id = Some(remote_order_id.to_string());
        Ok(())
    }

    fn find_for_user(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrderView>, DomainError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|o| o.id == order_id && o.user_id == user_id)
            .cloned())
    }

    fn find_by_id(&self, order_id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(self.order(order_id))
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let mut orders: Vec<OrderView> = self
            .lock()
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.reverse();
        Ok(orders)
    }

    fn set_order_status(
        &self,
        order_id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderView, DomainError> {
        let mut state = self.lock();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| DomainError::not_found("Order"))?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(DomainError::StatusConflict("payment pending".to_string()));
        }
        order.order_status = status;
        Ok(order.clone())
    }

    fn confirm_payment(
        &self,
        lookup: &IntentLookup,
        proof: &PaymentProof,
    ) -> Result<Confirmation, DomainError> {
        let mut state = self.lock();
        let idx = state
            .orders
            .iter()
            .position(|o| {
                o.remote_order_id.as_deref() == Some(lookup.remote_order_id.as_str())
                    && lookup.owner.map_or(true, |owner| owner == o.user_id)
            })
            .ok_or_else(|| DomainError::not_found("Order"))?;
        let order = state.orders[idx].clone();
        if order.payment_status == PaymentStatus::Paid {
            return Ok(Confirmation::AlreadyPaid { order_id: order.id });
        }

        let mut wanted: BTreeMap<Uuid, i32> = BTreeMap::new();
        for line in &order.lines {
            // Saturating: an overflowing total can never be covered by stock.
            let total = wanted.entry(line.variant_id).or_default();
            *total = total.saturating_add(line.quantity);
        }
        for (variant_id, quantity) in &wanted {
            let enough = state
                .variants
                .get(variant_id)
                .is_some_and(|v| v.stock >= *quantity);
            if !enough {
                let line = order.lines.iter().find(|l| l.variant_id == *variant_id);
                return Err(DomainError::FulfillmentException {
                    order_id: order.id,
                    product: line.map(|l| l.product_name.clone()).unwrap_or_default(),
                    size: line
                        .map(|l| l.variant_label.trim_start_matches("Size: ").to_string())
                        .unwrap_or_default(),
                });
            }
        }
        for (variant_id, quantity) in &wanted {
            if let Some(v) = state.variants.get_mut(variant_id) {
                v.stock -= quantity;
            }
        }

        let stored = &mut state.orders[idx];
        stored.payment_status = PaymentStatus::Paid;
        stored.order_status = OrderStatus::Paid;
        stored.remote_payment_id = Some(proof.remote_payment_id.clone());
        Ok(Confirmation::Applied { order_id: order.id })
    }
}

/// Gateway double. Payment signatures are valid when they equal
/// [`FakeGateway::payment_signature`]; webhooks when they equal
/// [`FakeGateway::WEBHOOK_SIGNATURE`].
#[derive(Default)]
pub struct FakeGateway {
    fail: bool,
    created: Mutex<Vec<i64>>,
    counter: AtomicUsize,
}

impl FakeGateway {
    pub const WEBHOOK_SIGNATURE: &'static str = "valid-webhook-signature";

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn payment_signature(intent_id: &str, payment_id: &str) -> String {
        format!("valid:{intent_id}|{payment_id}")
    }

    pub fn created_amounts(&self) -> Vec<i64> {
        self.created.lock().expect("gateway lock poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn publishable_key(&self) -> &str {
        "rzp_test_fake"
    }

    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        _receipt: &str,
    ) -> Result<RemoteIntent, DomainError> {
        if self.fail {
            return Err(DomainError::GatewayUnavailable("connection refused".to_string()));
        }
        self.created.lock().expect("gateway lock poisoned").push(amount_minor);
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(RemoteIntent {
            intent_id: format!("order_fake_{n}"),
            amount: amount_minor,
            currency: currency.to_string(),
        })
    }

    fn verify_payment_signature(&self, intent_id: &str, payment_id: &str, signature: &str) -> bool {
        signature == Self::payment_signature(intent_id, payment_id)
    }

    fn verify_webhook_signature(&self, _raw_body: &[u8], signature: &str) -> bool {
        signature == Self::WEBHOOK_SIGNATURE
    }

    fn parse_webhook_event(&self, raw_body: &[u8]) -> Result<WebhookEvent, DomainError> {
        razorpay::parse_webhook_event(raw_body)
    }
}
