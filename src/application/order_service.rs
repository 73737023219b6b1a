use std::sync::Arc;

use log::info;
use uuid::Uuid;

use super::run_blocking;
use crate::domain::caller::Caller;
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderStatus, OrderView, PaymentStatus};
use crate::domain::ports::OrderRepository;

pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>) -> Self {
        Self { repo }
    }

    /// One of the caller's orders; other users' orders are not found.
    pub async fn status(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderView, DomainError> {
        let repo = Arc::clone(&self.repo);
        run_blocking(move || repo.find_for_user(order_id, user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    /// The caller's orders, newest first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let repo = Arc::clone(&self.repo);
        run_blocking(move || repo.list_for_user(user_id)).await
    }

    /// Staff-only fulfilment update. Permission is checked first, then the
    /// order must exist and be paid before the requested status is parsed.
    pub async fn update_status(
        &self,
        caller: &Caller,
        order_id: Uuid,
        status: &str,
    ) -> Result<OrderView, DomainError> {
        if !caller.is_staff {
            return Err(DomainError::Forbidden(
                "Only staff can update order status".to_string(),
            ));
        }

        let repo = Arc::clone(&self.repo);
        let requested = status.to_string();
        let updated = run_blocking(move || {
            let order = repo
                .find_by_id(order_id)?
                .ok_or_else(|| DomainError::not_found("Order"))?;
            if order.payment_status != PaymentStatus::Paid {
                return Err(DomainError::StatusConflict(
                    "Cannot update status of an unpaid order".to_string(),
                ));
            }
            let status: OrderStatus = requested.parse()?;
            repo.set_order_status(order_id, status)
        })
        .await?;

        info!(
            "Order {} set to {} by staff user {}",
            updated.id, updated.order_status, caller.user_id
        );
        Ok(updated)
    }
}
