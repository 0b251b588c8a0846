use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::model::audit::AuditEventType;

/// Append-only writes into `audit_log` (§3, §4.6, §4.7).
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        event_type: AuditEventType,
        user_id: &str,
        sku: &str,
        reservation_id: &str,
        details: Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, event_type, user_id, sku, reservation_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_type.as_str())
        .bind(user_id)
        .bind(sku)
        .bind(reservation_id)
        .bind(details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn append_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event_type: AuditEventType,
        user_id: &str,
        sku: &str,
        reservation_id: &str,
        details: Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, event_type, user_id, sku, reservation_id, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_type.as_str())
        .bind(user_id)
        .bind(sku)
        .bind(reservation_id)
        .bind(details)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
