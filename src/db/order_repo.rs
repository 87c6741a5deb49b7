// src/db/order_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::scoped::StoreOwned;
use crate::models::orders::{Order, OrderItem, OrderStatus};
use crate::models::rbac::Permission;

impl StoreOwned for Order {
    const TABLE: &'static str = "orders";
    const ENTITY: &'static str = "order";
    const READ: Permission = Permission::OrderRead;
    const CREATE: Permission = Permission::OrderCreate;
    const UPDATE: Permission = Permission::OrderUpdate;
    // Pedidos nunca são apagados individualmente (só na cascata da loja);
    // o verbo existe no contrato, então exigimos a capacidade mais alta.
    const DELETE: Permission = Permission::OrderUpdate;

    fn store_id(&self) -> Uuid {
        self.store_id
    }
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_order<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        customer_id: Uuid,
        total_amount: Decimal,
        currency: &str,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (store_id, customer_id, total_amount, currency)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(customer_id)
        .bind(total_amount)
        .bind(currency)
        .fetch_one(executor)
        .await?;
        Ok(order)
    }

    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
    ) -> Result<OrderItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OrderItem>(
            r#"
            INSERT INTO order_items (store_id, order_id, product_id, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .fetch_one(executor)
        .await?;
        Ok(item)
    }

    pub async fn items_of<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<OrderItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE store_id = $1 AND order_id = $2",
        )
        .bind(store_id)
        .bind(order_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    /// Os pedidos do próprio cliente, em qualquer loja (escopo-próprio,
    /// não escopo-de-loja).
    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// O coração da concorrência do pedido: UPDATE condicional que só
    /// vence se o status ainda for `from`. Duas requisições simultâneas
    /// disputando a mesma transição: exatamente UMA afeta linhas; a
    /// outra recebe None e decide lá em cima o que isso significa
    /// (idempotência ou ConcurrentModification).
    pub async fn transition_status<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        reason: Option<&str>,
        tracking_code: Option<&str>,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                status = $4,
                status_reason = COALESCE($5, status_reason),
                tracking_code = COALESCE($6, tracking_code),
                paid_at      = CASE WHEN $4 = 'PAID'::order_status      THEN now() ELSE paid_at END,
                shipped_at   = CASE WHEN $4 = 'SHIPPED'::order_status   THEN now() ELSE shipped_at END,
                delivered_at = CASE WHEN $4 = 'DELIVERED'::order_status THEN now() ELSE delivered_at END,
                rejected_at  = CASE WHEN $4 = 'REJECTED'::order_status  THEN now() ELSE rejected_at END,
                cancelled_at = CASE WHEN $4 = 'CANCELLED'::order_status THEN now() ELSE cancelled_at END,
                updated_at = now()
            WHERE id = $2 AND store_id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(order_id)
        .bind(from)
        .bind(to)
        .bind(reason)
        .bind(tracking_code)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    /// Anexa a referência do comprovante. Só faz sentido enquanto o
    /// pedido aguarda conferência.
    pub async fn attach_proof<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        order_id: Uuid,
        payment_proof: &str,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET payment_proof = $3, updated_at = now()
            WHERE id = $2 AND store_id = $1 AND status = 'PENDING_ADMIN'::order_status
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(order_id)
        .bind(payment_proof)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    /// Contagem simples por status (o único "analytics" deste núcleo).
    pub async fn count_by_status(
        &self,
        store_id: Uuid,
    ) -> Result<Vec<(OrderStatus, i64)>, AppError> {
        let counts = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM orders WHERE store_id = $1 GROUP BY status",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }
}
