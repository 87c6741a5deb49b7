// src/db/catalog_repo.rs

use rust_decimal::Decimal;
use sqlx::query_builder::Separated;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::db::scoped::{StoreOwned, StoreOwnedWrite};
use crate::models::catalog::Product;
use crate::models::rbac::Permission;

// ---
// 1. Product no contrato escopado
// ---
impl StoreOwned for Product {
    const TABLE: &'static str = "products";
    const ENTITY: &'static str = "product";
    const READ: Permission = Permission::ProductRead;
    const CREATE: Permission = Permission::ProductCreate;
    const UPDATE: Permission = Permission::ProductUpdate;
    const DELETE: Permission = Permission::ProductDelete;

    fn store_id(&self) -> Uuid {
        self.store_id
    }
}

pub struct ProductCreateData {
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub stock_quantity: i32,
}

pub struct ProductUpdateData {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl StoreOwnedWrite for Product {
    type Create = ProductCreateData;
    type Update = ProductUpdateData;

    fn insert_columns() -> &'static str {
        "name, sku, description, price, currency, stock_quantity"
    }

    fn push_insert_values(
        sep: &mut Separated<'_, '_, Postgres, &'static str>,
        data: &Self::Create,
    ) {
        sep.push_bind(data.name.clone());
        sep.push_bind(data.sku.clone());
        sep.push_bind(data.description.clone());
        sep.push_bind(data.price);
        sep.push_bind(data.currency.clone());
        sep.push_bind(data.stock_quantity);
    }

    fn push_update_assignments(qb: &mut QueryBuilder<'_, Postgres>, data: &Self::Update) {
        if let Some(name) = &data.name {
            qb.push(", name = ");
            qb.push_bind(name.clone());
        }
        if let Some(description) = &data.description {
            qb.push(", description = ");
            qb.push_bind(description.clone());
        }
        if let Some(price) = data.price {
            qb.push(", price = ");
            qb.push_bind(price);
        }
        if let Some(is_active) = data.is_active {
            qb.push(", is_active = ");
            qb.push_bind(is_active);
        }
    }
}

// ---
// 2. Operações de estoque (fora do CRUD genérico)
// ---
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Ajuste atômico de estoque. A condição `stock_quantity + delta >= 0`
    /// faz o banco rejeitar saldo negativo na MESMA instrução — duas
    /// confirmações concorrentes nunca baixam o mesmo estoque duas vezes
    /// além do disponível.
    pub async fn adjust_stock<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        product_id: Uuid,
        delta: i32,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $3, updated_at = now()
            WHERE id = $2 AND store_id = $1 AND stock_quantity + $3 >= 0
            RETURNING *
            "#,
        )
        .bind(store_id)
        .bind(product_id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    /// Distingue "produto não existe nesta loja" de "estoque
    /// insuficiente" depois de um adjust_stock frustrado.
    pub async fn exists_in_store(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM products WHERE id = $2 AND store_id = $1)",
        )
        .bind(store_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Carrega os produtos de um pedido em criação, escopados à loja.
    /// Qualquer id que não pertença à loja simplesmente não volta.
    pub async fn find_many_by_ids<'e, E>(
        &self,
        executor: E,
        store_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE store_id = $1 AND id = ANY($2)",
        )
        .bind(store_id)
        .bind(ids)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }
}
