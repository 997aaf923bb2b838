//! Order Repository Implementation
//!
//! PostgreSQL implementation of the OrderRepository trait, including the
//! last-write-wins upsert used by storefront sync.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    Address, Order, OrderChannel, OrderFilter, OrderItem, OrderRepository, OrderStatus,
    PaymentMode, UpsertOutcome,
};
use crate::infrastructure::database::map_write_error;
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

const COLUMNS: &str = "id, company_id, channel, store_id, external_id, order_number, status, \
                       payment_mode, customer_name, customer_email, customer_phone, \
                       shipping_address, items, subtotal, discount, shipping, total, currency, \
                       weight_grams, promo_code, external_updated_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    company_id: Uuid,
    channel: String,
    store_id: Option<Uuid>,
    external_id: Option<i64>,
    order_number: String,
    status: String,
    payment_mode: String,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: String,
    shipping_address: Json<Address>,
    items: Json<Vec<OrderItem>>,
    subtotal: i64,
    discount: i64,
    shipping: i64,
    total: i64,
    currency: String,
    weight_grams: i32,
    promo_code: Option<String>,
    external_updated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Order {
        Order {
            id: self.id,
            company_id: self.company_id,
            channel: OrderChannel::from_str(&self.channel),
            store_id: self.store_id,
            external_id: self.external_id,
            order_number: self.order_number,
            status: OrderStatus::from_str(&self.status),
            payment_mode: PaymentMode::from_str(&self.payment_mode),
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            shipping_address: self.shipping_address.0,
            items: self.items.0,
            subtotal: self.subtotal,
            discount: self.discount,
            shipping: self.shipping,
            total: self.total,
            currency: self.currency,
            weight_grams: self.weight_grams,
            promo_code: self.promo_code,
            external_updated_at: self.external_updated_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL order repository implementation.
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OrderRow::into_order))
    }

    async fn find_by_external_id(
        &self,
        store_id: Uuid,
        external_id: i64,
    ) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {COLUMNS} FROM orders WHERE store_id = $1 AND external_id = $2"
        ))
        .bind(store_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OrderRow::into_order))
    }

    async fn create(&self, order: &Order) -> Result<Order, AppError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (id, company_id, channel, store_id, external_id, order_number,
                                status, payment_mode, customer_name, customer_email,
                                customer_phone, shipping_address, items, subtotal, discount,
                                shipping, total, currency, weight_grams, promo_code,
                                external_updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(order.id)
        .bind(order.company_id)
        .bind(order.channel.as_str())
        .bind(order.store_id)
        .bind(order.external_id)
        .bind(&order.order_number)
        .bind(order.status.as_str())
        .bind(order.payment_mode.as_str())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.items))
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.shipping)
        .bind(order.total)
        .bind(&order.currency)
        .bind(order.weight_grams)
        .bind(&order.promo_code)
        .bind(order.external_updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Order already exists for this store"))?;

        Ok(row.into_order())
    }

    async fn list(
        &self,
        filter: &OrderFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Order>, i64), AppError> {
        let status = filter.status.map(|s| s.as_str());
        let channel = filter.channel.map(|c| c.as_str());

        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM orders
            WHERE ($1::UUID IS NULL OR company_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR channel = $3)
              AND ($4::UUID IS NULL OR store_id = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.company_id)
        .bind(status)
        .bind(channel)
        .bind(filter.store_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE ($1::UUID IS NULL OR company_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR channel = $3)
              AND ($4::UUID IS NULL OR store_id = $4)
            "#,
        )
        .bind(filter.company_id)
        .bind(status)
        .bind(channel)
        .bind(filter.store_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(OrderRow::into_order).collect(), total))
    }

    async fn upsert_external(&self, order: &Order) -> Result<UpsertOutcome, AppError> {
        let (store_id, external_id) = match (order.store_id, order.external_id) {
            (Some(store_id), Some(external_id)) => (store_id, external_id),
            _ => {
                return Err(AppError::Internal(
                    "storefront order without store_id/external_id".to_string(),
                ))
            }
        };

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (id, company_id, channel, store_id, external_id, order_number,
                                status, payment_mode, customer_name, customer_email,
                                customer_phone, shipping_address, items, subtotal, discount,
                                shipping, total, currency, weight_grams, external_updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20)
            ON CONFLICT (store_id, external_id) DO NOTHING
            "#,
        )
        .bind(order.id)
        .bind(order.company_id)
        .bind(order.channel.as_str())
        .bind(store_id)
        .bind(external_id)
        .bind(&order.order_number)
        .bind(order.status.as_str())
        .bind(order.payment_mode.as_str())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(&order.customer_phone)
        .bind(Json(&order.shipping_address))
        .bind(Json(&order.items))
        .bind(order.subtotal)
        .bind(order.discount)
        .bind(order.shipping)
        .bind(order.total)
        .bind(&order.currency)
        .bind(order.weight_grams)
        .bind(order.external_updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 1 {
            tx.commit().await?;
            return Ok(UpsertOutcome::Created);
        }

        let stored = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT external_updated_at FROM orders WHERE store_id = $1 AND external_id = $2 FOR UPDATE",
        )
        .bind(store_id)
        .bind(external_id)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = UpsertOutcome::decide(stored, order.external_updated_at);
        if outcome == UpsertOutcome::Updated {
            sqlx::query(
                r#"
                UPDATE orders
                SET order_number = $3,
                    status = $4,
                    payment_mode = $5,
                    customer_name = $6,
                    customer_email = $7,
                    customer_phone = $8,
                    shipping_address = $9,
                    items = $10,
                    subtotal = $11,
                    discount = $12,
                    shipping = $13,
                    total = $14,
                    currency = $15,
                    weight_grams = $16,
                    external_updated_at = $17,
                    updated_at = NOW()
                WHERE store_id = $1 AND external_id = $2
                "#,
            )
            .bind(store_id)
            .bind(external_id)
            .bind(&order.order_number)
            .bind(order.status.as_str())
            .bind(order.payment_mode.as_str())
            .bind(&order.customer_name)
            .bind(&order.customer_email)
            .bind(&order.customer_phone)
            .bind(Json(&order.shipping_address))
            .bind(Json(&order.items))
            .bind(order.subtotal)
            .bind(order.discount)
            .bind(order.shipping)
            .bind(order.total)
            .bind(&order.currency)
            .bind(order.weight_grams)
            .bind(order.external_updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status.as_str())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Order {} not found", id)));
        }

        Ok(())
    }
}
