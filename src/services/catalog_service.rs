// src/services/catalog_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::db_utils::begin_store_tx,
    common::error::AppError,
    db::audit_repo::NewAuditEntry,
    db::catalog_repo::{ProductCreateData, ProductUpdateData},
    db::{AuditRepository, ProductRepository, ScopedRepo, StoreRepository},
    middleware::tenancy::TenantContext,
    models::catalog::Product,
    models::rbac::Permission,
    services::authz::PermissionEngine,
};

#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
    engine: PermissionEngine,
    scoped: ScopedRepo<Product>,
    product_repo: ProductRepository,
    store_repo: StoreRepository,
    audit_repo: AuditRepository,
}

impl CatalogService {
    pub fn new(pool: PgPool, engine: PermissionEngine) -> Self {
        Self {
            scoped: ScopedRepo::new(pool.clone(), engine.clone()),
            product_repo: ProductRepository::new(pool.clone()),
            store_repo: StoreRepository::new(pool.clone()),
            audit_repo: AuditRepository::new(pool.clone()),
            engine,
            pool,
        }
    }

    // O CRUD passa inteiro pelo repositório escopado: vínculo +
    // permissão + escopo de loja + log, tudo num caminho só.

    pub async fn create_product(
        &self,
        ctx: &TenantContext,
        mut data: ProductCreateData,
    ) -> Result<Product, AppError> {
        let store_id = ctx.require_store()?;

        if data.stock_quantity < 0 {
            return Err(AppError::ValidationFailed(
                "O estoque inicial não pode ser negativo.".to_string(),
            ));
        }

        // Moeda vazia herda a da loja.
        if data.currency.is_empty() {
            let store = self
                .store_repo
                .find_by_id(store_id)
                .await?
                .ok_or(AppError::NotFound)?;
            data.currency = store.currency;
        }

        self.scoped.create(ctx, store_id, &data).await
    }

    pub async fn list_products(&self, ctx: &TenantContext) -> Result<Vec<Product>, AppError> {
        let store_id = ctx.require_store()?;
        self.scoped.find_many(ctx, store_id).await
    }

    pub async fn get_product(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
    ) -> Result<Product, AppError> {
        self.scoped.find_unique(ctx, product_id).await
    }

    pub async fn update_product(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        data: ProductUpdateData,
    ) -> Result<Product, AppError> {
        let store_id = ctx.require_store()?;
        self.scoped.update(ctx, store_id, product_id, &data).await
    }

    pub async fn delete_product(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
    ) -> Result<(), AppError> {
        let store_id = ctx.require_store()?;
        self.scoped.delete(ctx, store_id, product_id).await
    }

    /// Ajuste manual de estoque (entrada de mercadoria, correção,
    /// perda). Atômico e com trilha no livro-razão de auditoria.
    pub async fn adjust_stock(
        &self,
        ctx: &TenantContext,
        product_id: Uuid,
        delta: i32,
        note: Option<&str>,
    ) -> Result<Product, AppError> {
        let store_id = ctx.require_store()?;
        self.engine
            .ensure(ctx, Permission::StockAdjust, store_id)
            .await?;

        if delta == 0 {
            return Err(AppError::ValidationFailed(
                "O ajuste de estoque não pode ser zero.".to_string(),
            ));
        }

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let product = self
            .product_repo
            .adjust_stock(&mut *tx, store_id, product_id, delta)
            .await?;

        let Some(product) = product else {
            // Não existe nesta loja OU ficaria negativo — distinguimos
            // só para a mensagem; de outra loja continua "não existe".
            let exists = self
                .product_repo
                .exists_in_store(store_id, product_id)
                .await?;
            return Err(if exists {
                AppError::ValidationFailed(
                    "O ajuste deixaria o estoque negativo.".to_string(),
                )
            } else {
                AppError::NotFound
            });
        };

        let from_state = (product.stock_quantity - delta).to_string();
        let to_state = product.stock_quantity.to_string();
        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "product",
                    resource_id: product.id,
                    actor_id: ctx.actor_id,
                    action: "stock.adjust",
                    from_state: Some(&from_state),
                    to_state: Some(&to_state),
                    reason: note,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(product)
    }
}
