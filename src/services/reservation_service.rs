use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::config::Settings;
use crate::errors::AppError;
use crate::model::reservation::{new_reservation_id, Reservation};
use crate::redis_store::{IdempotencyCache, IdempotencyRecord, LedgerError, ReservationLedger, StockStore};
use crate::redis_store::stock::DecrementOutcome;

#[derive(Debug, Error)]
pub enum ReserveError {
    #[error("quantity must be between {min} and {max}")]
    InvalidQuantity { min: i32, max: i32 },
    #[error("insufficient inventory: {available} available")]
    InsufficientInventory { available: i64 },
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ReserveError> for AppError {
    fn from(err: ReserveError) -> Self {
        match err {
            ReserveError::InvalidQuantity { min, max } => AppError::Validation(format!(
                "quantity must be between {min} and {max}"
            )),
            ReserveError::InsufficientInventory { available } => {
                AppError::InsufficientInventory { available }
            }
            ReserveError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("reservation not found")]
    NotFound,
    #[error("reservation expired")]
    Expired,
    #[error("wrong owner")]
    WrongOwner,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ConfirmError> for AppError {
    fn from(err: ConfirmError) -> Self {
        match err {
            ConfirmError::NotFound => AppError::ReservationNotFound,
            ConfirmError::Expired => AppError::ReservationExpired,
            ConfirmError::WrongOwner => AppError::Forbidden("wrong owner".to_string()),
            ConfirmError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum CancelError {
    #[error("wrong owner")]
    WrongOwner,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CancelError> for AppError {
    fn from(err: CancelError) -> Self {
        match err {
            CancelError::WrongOwner => AppError::Forbidden("wrong owner".to_string()),
            CancelError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<LedgerError> for CancelError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::WrongOwner => CancelError::WrongOwner,
            // `cancel` treats a missing reservation as a no-op (false),
            // never as an error; the caller checks for that case before
            // this conversion ever applies to a NotFound.
            LedgerError::NotFound => CancelError::Internal("unexpected not_found".to_string()),
            LedgerError::Expired => CancelError::Internal("unexpected expired".to_string()),
            LedgerError::Redis(e) => CancelError::Internal(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InventoryStatus {
    pub available: i64,
    pub reserved: i64,
    pub total: i64,
}

/// Orchestrates the Stock Store, Ledger and Idempotency Cache behind the
/// reserve/confirm/cancel/release/status surface (§4.3). This is the one
/// component that mutates stock, the ledger and the expiry index and the
/// reserved-sum counter; everything else (the Sweeper, cancel) reuses its
/// `release` path rather than touching those stores directly (§3
/// Ownership).
#[derive(Clone)]
pub struct ReservationService {
    stock: StockStore,
    ledger: ReservationLedger,
    idempotency: IdempotencyCache,
    settings: Arc<Settings>,
}

pub struct ReserveOutcome {
    pub reservation_id: String,
    pub expires_at: i64,
}

impl ReservationService {
    pub fn new(
        stock: StockStore,
        ledger: ReservationLedger,
        idempotency: IdempotencyCache,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            stock,
            ledger,
            idempotency,
            settings,
        }
    }

    pub fn stock(&self) -> &StockStore {
        &self.stock
    }

    /// Read-only ledger lookup; used by the Order Promoter to short-
    /// circuit before touching the relational store (§4.7 step 1).
    pub async fn lookup(&self, reservation_id: &str) -> Result<Option<Reservation>, String> {
        self.ledger.lookup(reservation_id).await.map_err(|e| e.to_string())
    }

    /// §4.3 reserve algorithm. `sku` must already be normalised by the
    /// caller (the HTTP layer owns SKU parsing/validation).
    pub async fn reserve(
        &self,
        sku: &str,
        quantity: i32,
        user_id: &str,
        idempotency_key: Option<&str>,
    ) -> Result<ReserveOutcome, ReserveError> {
        if quantity < self.settings.min_quantity_per_reserve
            || quantity > self.settings.max_quantity_per_reserve
        {
            return Err(ReserveError::InvalidQuantity {
                min: self.settings.min_quantity_per_reserve,
                max: self.settings.max_quantity_per_reserve,
            });
        }

        // Step 1: idempotency gate runs before any stock mutation.
        if let Some(key) = idempotency_key {
            if let Some(record) = self
                .idempotency
                .get(key)
                .await
                .map_err(|e| ReserveError::Internal(e.to_string()))?
            {
                return Ok(ReserveOutcome {
                    reservation_id: record.reservation_id,
                    expires_at: record.expires_at,
                });
            }
        }

        // Step 2: atomic check-and-decrement.
        let outcome = self
            .stock
            .try_decrement(sku, quantity as i64)
            .await
            .map_err(|e| ReserveError::Internal(e.to_string()))?;
        if let DecrementOutcome::Insufficient { available } = outcome {
            tracing::warn!(sku, quantity, available, "reserve rejected: insufficient inventory");
            return Err(ReserveError::InsufficientInventory { available });
        }

        // Steps 3-4: mint the reservation and index it. A failure here is
        // compensated by restoring the decrement before surfacing the
        // error, since the hot path must never silently strand stock.
        let now = Utc::now().timestamp();
        let expires_at = now + self.settings.reservation_ttl_seconds as i64;
        let reservation = Reservation {
            reservation_id: new_reservation_id(),
            user_id: user_id.to_string(),
            sku: sku.to_string(),
            quantity: quantity as i64,
            created_at: now,
            expires_at,
        };

        if let Err(e) = self.ledger.insert(&reservation).await {
            tracing::error!(sku, quantity, error = %e, "ledger insert failed, compensating with restore");
            let _ = self.stock.restore(sku, quantity as i64).await;
            return Err(ReserveError::Internal(e.to_string()));
        }
        if let Err(e) = self.stock.incr_reserved(sku, quantity as i64).await {
            tracing::error!(sku, error = %e, "reserved-sum counter update failed (advisory, not fatal)");
        }

        // Step 5: record the idempotency response, if requested.
        if let Some(key) = idempotency_key {
            let record = IdempotencyRecord {
                reservation_id: reservation.reservation_id.clone(),
                sku: sku.to_string(),
                quantity: quantity as i64,
                expires_at,
            };
            if let Err(e) = self
                .idempotency
                .put(key, &record, self.settings.idempotency_cache_ttl_seconds)
                .await
            {
                tracing::error!(key, error = %e, "failed to record idempotency response");
            }
        }

        tracing::info!(
            reservation_id = %reservation.reservation_id,
            sku,
            quantity,
            user_id,
            "reservation created"
        );

        Ok(ReserveOutcome {
            reservation_id: reservation.reservation_id,
            expires_at,
        })
    }

    /// Consumes the held units for good; does not restore stock.
    pub async fn confirm(
        &self,
        reservation_id: &str,
        user_id: &str,
    ) -> Result<Reservation, ConfirmError> {
        let now = Utc::now().timestamp();
        let reservation = self
            .ledger
            .consume(
                reservation_id,
                user_id,
                now,
                self.settings.confirm_grace_seconds,
            )
            .await
            .map_err(|e| match e {
                LedgerError::NotFound => ConfirmError::NotFound,
                LedgerError::Expired => ConfirmError::Expired,
                LedgerError::WrongOwner => ConfirmError::WrongOwner,
                LedgerError::Redis(e) => ConfirmError::Internal(e.to_string()),
            })?;

        if let Err(e) = self
            .stock
            .incr_reserved(&reservation.sku, -reservation.quantity)
            .await
        {
            tracing::error!(sku = %reservation.sku, error = %e, "reserved-sum counter update failed (advisory, not fatal)");
        }

        tracing::info!(reservation_id, user_id, sku = %reservation.sku, "reservation confirmed");
        Ok(reservation)
    }

    /// Owner-checked cancel. Returns `Ok(false)` if the reservation is
    /// already gone (idempotent); fails with `WrongOwner` without
    /// restoring stock if the principal doesn't match.
    pub async fn cancel(&self, reservation_id: &str, user_id: &str) -> Result<bool, CancelError> {
        match self.ledger.cancel_pop(reservation_id, user_id).await {
            Ok(reservation) => {
                self.stock
                    .restore(&reservation.sku, reservation.quantity)
                    .await
                    .map_err(|e| CancelError::Internal(e.to_string()))?;
                if let Err(e) = self
                    .stock
                    .incr_reserved(&reservation.sku, -reservation.quantity)
                    .await
                {
                    tracing::error!(sku = %reservation.sku, error = %e, "reserved-sum counter update failed (advisory, not fatal)");
                }
                tracing::info!(reservation_id, user_id, sku = %reservation.sku, "reservation cancelled");
                Ok(true)
            }
            Err(LedgerError::NotFound) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Internal release used by the Sweeper (and as cancel's
    /// non-owner-checked sibling). No ownership check; idempotent because
    /// `take` is an atomic pop that only the first racing caller sees
    /// succeed.
    pub async fn release(&self, reservation_id: &str) -> Result<Option<Reservation>, String> {
        let popped = self
            .ledger
            .take(reservation_id)
            .await
            .map_err(|e| e.to_string())?;
        if let Some(reservation) = &popped {
            self.stock
                .restore(&reservation.sku, reservation.quantity)
                .await
                .map_err(|e| e.to_string())?;
            if let Err(e) = self
                .stock
                .incr_reserved(&reservation.sku, -reservation.quantity)
                .await
            {
                tracing::error!(sku = %reservation.sku, error = %e, "reserved-sum counter update failed (advisory, not fatal)");
            }
        }
        Ok(popped)
    }

    /// `available` is authoritative; `reserved`/`total` are advisory
    /// (§4.3, Open Question #1).
    pub async fn get_inventory_status(&self, sku: &str) -> Result<InventoryStatus, String> {
        let available = self.stock.get(sku).await.map_err(|e| e.to_string())?;
        let reserved = self.stock.get_reserved(sku).await.map_err(|e| e.to_string())?;
        Ok(InventoryStatus {
            available,
            reserved,
            total: available + reserved,
        })
    }

    /// Ids whose expiry score is `<= now` (§4.2 `range_due`), used by the
    /// Sweeper. Advisory: a concurrent consume/release may have already
    /// removed an entry by the time the caller acts on it.
    pub async fn due_reservations(&self, now: i64) -> Result<Vec<String>, String> {
        self.ledger.range_due(now).await.map_err(|e| e.to_string())
    }

    /// Administrative override. Does not reset the reserved-sum counter:
    /// outstanding reservations against the old quantity remain valid
    /// (§4.3).
    pub async fn set_inventory(&self, sku: &str, quantity: i64) -> Result<(), String> {
        self.stock.set(sku, quantity).await.map_err(|e| e.to_string())
    }
}
