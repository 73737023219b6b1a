use std::sync::Arc;

use uuid::Uuid;

use super::run_blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::CartView;
use crate::domain::ports::{CartRepository, CatalogRepository};

pub struct CartService {
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, carts: Arc<dyn CartRepository>) -> Self {
        Self { catalog, carts }
    }

    /// The caller's cart, created on first access.
    pub async fn view(&self, user_id: Uuid) -> Result<CartView, DomainError> {
        let carts = Arc::clone(&self.carts);
        run_blocking(move || carts.get_or_create_cart(user_id)).await
    }

    /// Adds `quantity` of a variant. The resulting line may not exceed the
    /// variant's current stock.
    pub async fn add(
        &self,
        user_id: Uuid,
        variant_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidInput(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let catalog = Arc::clone(&self.catalog);
        let carts = Arc::clone(&self.carts);
        run_blocking(move || {
            let variant = catalog
                .find_variant_by_id(variant_id)?
                .ok_or_else(|| DomainError::not_found("Product variant"))?;
            let in_cart = carts
                .find_cart(user_id)?
                .and_then(|cart| {
                    cart.items
                        .into_iter()
                        .find(|item| item.variant.variant_id == variant_id)
                })
                .map_or(0, |item| item.quantity);

            let fits = in_cart
                .checked_add(quantity)
                .is_some_and(|wanted| wanted <= variant.stock);
            if !fits {
                return Err(DomainError::InsufficientStock {
                    product: variant.product_name,
                    size: variant.size,
                });
            }
            carts.add_item(user_id, variant_id, quantity)
        })
        .await
    }

    pub async fn remove(&self, user_id: Uuid, item_id: Uuid) -> Result<CartView, DomainError> {
        let carts = Arc::clone(&self.carts);
        run_blocking(move || carts.remove_item(user_id, item_id)).await
    }
}
