use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::model::order::{Order, OrderItem, OrderWithItems};

/// Append-only writes into the relational `orders`/`order_items` tables
/// (§3, §4.7). The Order Promoter is the sole owner of order-row
/// mutations.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_pending(
        &self,
        order_id: &str,
        user_id: &str,
        total_amount: Decimal,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (order_id, user_id, status, total_amount)
            VALUES ($1, $2, 'pending', $3)
            RETURNING order_id, user_id, status, total_amount, created_at
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .bind(total_amount)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn mark_failed(&self, order_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET status = 'failed' WHERE order_id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_confirmed_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE orders SET status = 'confirmed' WHERE order_id = $1")
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn insert_item_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_id: &str,
        sku: &str,
        quantity: i32,
        price_per_unit: Decimal,
    ) -> Result<OrderItem, sqlx::Error> {
        sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (id, order_id, sku, quantity, price_per_unit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, order_id, sku, quantity, price_per_unit
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(sku)
        .bind(quantity)
        .bind(price_per_unit)
        .fetch_one(&mut **tx)
        .await
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn get_with_items(&self, order_id: &str) -> Result<Option<OrderWithItems>, sqlx::Error> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT order_id, user_id, status, total_amount, created_at FROM orders WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, sku, quantity, price_per_unit FROM order_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(OrderWithItems { order, items }))
    }
}
