use std::sync::Arc;

use serde_json::json;
use thiserror::Error;

use crate::errors::AppError;
use crate::model::audit::AuditEventType;
use crate::model::order::{new_order_id, OrderWithItems};
use crate::repository::audit_repository::AuditRepository;
use crate::repository::order_repository::OrderRepository;
use crate::services::price_catalog::PriceCatalog;
use crate::services::reservation_service::{ConfirmError, ReservationService};

#[derive(Debug, Error)]
pub enum PromoteError {
    #[error("reservation not found")]
    NotFound,
    #[error("reservation expired")]
    Expired,
    #[error("wrong owner")]
    WrongOwner,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PromoteError> for AppError {
    fn from(err: PromoteError) -> Self {
        match err {
            PromoteError::NotFound => AppError::ReservationNotFound,
            PromoteError::Expired => AppError::ReservationExpired,
            PromoteError::WrongOwner => AppError::Forbidden("wrong owner".to_string()),
            PromoteError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ConfirmError> for PromoteError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::NotFound => PromoteError::NotFound,
            ConfirmError::Expired => PromoteError::Expired,
            ConfirmError::WrongOwner => PromoteError::WrongOwner,
            ConfirmError::Internal(msg) => PromoteError::Internal(msg),
        }
    }
}

/// Dual-write coordinator that promotes a live reservation into a
/// persisted order, in the pending-first ordering adopted by §4.7 /
/// §9 Open Question #4: it avoids double-charging at the cost of an
/// ignorable stranded `failed` row if the relational commit fails after
/// the ledger consume already succeeded.
#[derive(Clone)]
pub struct OrderPromoter {
    reservation_service: ReservationService,
    orders: OrderRepository,
    audit: AuditRepository,
    price_catalog: Arc<dyn PriceCatalog>,
}

impl OrderPromoter {
    pub fn new(
        reservation_service: ReservationService,
        orders: OrderRepository,
        audit: AuditRepository,
        price_catalog: Arc<dyn PriceCatalog>,
    ) -> Self {
        Self {
            reservation_service,
            orders,
            audit,
            price_catalog,
        }
    }

    pub async fn confirm_checkout(
        &self,
        reservation_id: &str,
        user_id: &str,
    ) -> Result<OrderWithItems, PromoteError> {
        // Step 1: surface not_found without touching the relational store
        // if the ledger entry is already gone.
        let Some(reservation) = self
            .reservation_service
            .lookup(reservation_id)
            .await
            .map_err(PromoteError::Internal)?
        else {
            return Err(PromoteError::NotFound);
        };

        // Step 2: insert the pending order with the derived total.
        let order_id = new_order_id();
        let price_per_unit = self.price_catalog.price_for(&reservation.sku);
        let total_amount = price_per_unit * rust_decimal::Decimal::from(reservation.quantity);
        self.orders
            .insert_pending(&order_id, user_id, total_amount)
            .await
            .map_err(|e| PromoteError::Internal(e.to_string()))?;

        // Step 3: consume the ledger entry for good.
        let confirmed_reservation = match self.reservation_service.confirm(reservation_id, user_id).await {
            Ok(r) => r,
            Err(err) => {
                if let Err(e) = self.orders.mark_failed(&order_id).await {
                    tracing::error!(order_id, error = %e, "failed to mark order as failed after confirm rejection");
                }
                return Err(err.into());
            }
        };

        // Step 4: finalise the order, the item and the audit event in one
        // relational transaction.
        let finalize = async {
            let mut tx = self.orders.begin().await?;
            self.orders.mark_confirmed_tx(&mut tx, &order_id).await?;
            self.orders
                .insert_item_tx(
                    &mut tx,
                    &order_id,
                    &confirmed_reservation.sku,
                    confirmed_reservation.quantity as i32,
                    price_per_unit,
                )
                .await?;
            self.audit
                .append_tx(
                    &mut tx,
                    AuditEventType::Confirm,
                    user_id,
                    &confirmed_reservation.sku,
                    reservation_id,
                    json!({ "order_id": order_id, "quantity": confirmed_reservation.quantity }),
                )
                .await?;
            tx.commit().await
        }
        .await;

        if let Err(e) = finalize {
            // Step 5: the ledger entry is already gone and stock is
            // already deducted; this divergence is logged for an
            // operator/reconciliation job to pick up, not auto-healed
            // (§4.7 step 5, §9 Open Question #3).
            tracing::error!(
                order_id,
                reservation_id,
                error = %e,
                "order finalise transaction failed after ledger consume succeeded; order left in failed state"
            );
            if let Err(e) = self.orders.mark_failed(&order_id).await {
                tracing::error!(order_id, error = %e, "failed to mark order as failed after finalise failure");
            }
            return Err(PromoteError::Internal(e.to_string()));
        }

        self.orders
            .get_with_items(&order_id)
            .await
            .map_err(|e| PromoteError::Internal(e.to_string()))?
            .ok_or_else(|| PromoteError::Internal("order vanished after commit".to_string()))
    }

    pub fn orders(&self) -> &OrderRepository {
        &self.orders
    }
}
