use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            other => Err(DomainError::Internal(format!("Unknown payment status '{other}'"))),
        }
    }
}

/// Fulfilment state of an order. `Processing` is the only state allowed
/// before payment; everything after it requires `PaymentStatus::Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Processing,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Processing,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Paid => "Paid",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
                DomainError::InvalidInput(format!(
                    "Invalid order status '{s}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

// ── Checkout inputs ──────────────────────────────────────────────────────────

/// A client-submitted line: which variant and how many.
#[derive(Debug, Clone)]
pub struct LineItemRequest {
    pub sku: String,
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ShippingDetails {
    pub address: String,
    pub apartment: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub phone: String,
}

impl ShippingDetails {
    /// Multi-line postal address. Blank parts are left out rather than
    /// producing empty lines or stray separators.
    pub fn address_snapshot(&self) -> String {
        let region = join_present(&[self.state.as_str(), self.zip_code.as_str()], " ");
        let locality = join_present(&[self.city.as_str(), region.as_str()], ", ");
        join_present(
            &[
                self.address.as_str(),
                self.apartment.as_str(),
                locality.as_str(),
                self.country.as_str(),
            ],
            "\n",
        )
    }
}

fn join_present(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Live catalog data for one purchasable variant.
#[derive(Debug, Clone)]
pub struct VariantSnapshot {
    pub variant_id: Uuid,
    pub product_name: String,
    pub size: String,
    pub unit_price: BigDecimal,
    pub stock: i32,
}

/// A line priced at checkout time; becomes an immutable order line.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub variant_id: Uuid,
    pub product_name: String,
    pub size: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

impl PricedLine {
    pub fn variant_label(&self) -> String {
        format!("Size: {}", self.size)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub shipping_address: String,
    pub phone: String,
    pub total_amount: BigDecimal,
    pub lines: Vec<PricedLine>,
}

// ── Read models ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub product_name: String,
    pub variant_label: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub shipping_address: String,
    pub phone: String,
    pub total_amount: BigDecimal,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub remote_order_id: Option<String>,
    pub remote_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

// ── Confirmation ─────────────────────────────────────────────────────────────

/// How the order being confirmed is located.
#[derive(Debug, Clone)]
pub struct IntentLookup {
    pub remote_order_id: String,
    /// `Some` for client verification; webhooks are not user-scoped.
    pub owner: Option<Uuid>,
}

/// Evidence from the gateway that the payment happened.
#[derive(Debug, Clone)]
pub struct PaymentProof {
    pub remote_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Stock was deducted and the order marked paid by this call.
    Applied { order_id: Uuid },
    /// The order had already been paid; nothing was written.
    AlreadyPaid { order_id: Uuid },
}

impl Confirmation {
    pub fn order_id(&self) -> Uuid {
        match self {
            Confirmation::Applied { order_id } | Confirmation::AlreadyPaid { order_id } => {
                *order_id
            }
        }
    }
}

// ── Cart ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: Uuid,
    pub variant: VariantSnapshot,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub cart_id: Uuid,
    pub items: Vec<CartLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_parses_canonical_values() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn order_status_rejects_lowercase_sentinel() {
        let err = "paid".parse::<OrderStatus>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(msg) if msg.contains("Processing, Paid")));
    }

    #[test]
    fn payment_status_round_trips_through_str() {
        assert_eq!("Paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn address_snapshot_joins_parts() {
        let shipping = ShippingDetails {
            address: "12 MG Road".into(),
            apartment: "Flat 4".into(),
            city: "Vijayawada".into(),
            state: "AP".into(),
            zip_code: "520001".into(),
            country: "India".into(),
            phone: "9999999999".into(),
        };
        assert_eq!(
            shipping.address_snapshot(),
            "12 MG Road\nFlat 4\nVijayawada, AP 520001\nIndia"
        );
    }

    #[test]
    fn address_snapshot_skips_blank_parts() {
        let shipping = ShippingDetails {
            address: "12 MG Road".into(),
            apartment: "  ".into(),
            city: "Vijayawada".into(),
            state: String::new(),
            zip_code: "520001".into(),
            country: "India".into(),
            phone: String::new(),
        };
        assert_eq!(shipping.address_snapshot(), "12 MG Road\nVijayawada, 520001\nIndia");

        let street_only = ShippingDetails {
            address: "12 MG Road".into(),
            ..ShippingDetails::default()
        };
        assert_eq!(street_only.address_snapshot(), "12 MG Road");
    }
}
