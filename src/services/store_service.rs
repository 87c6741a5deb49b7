// src/services/store_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::db_utils::begin_store_tx,
    common::error::AppError,
    db::audit_repo::NewAuditEntry,
    db::{AuditRepository, ScopedRepo, StoreRepository, UserRepository},
    middleware::tenancy::TenantContext,
    models::auth::GlobalRole,
    models::rbac::Permission,
    models::store::{AssignmentRole, Store, StoreMember, StoreStatus},
    services::authz::PermissionEngine,
};

#[derive(Clone)]
pub struct StoreService {
    pool: PgPool,
    engine: PermissionEngine,
    store_repo: StoreRepository,
    user_repo: UserRepository,
    scoped_members: ScopedRepo<StoreMember>,
    audit_repo: AuditRepository,
}

impl StoreService {
    pub fn new(pool: PgPool, engine: PermissionEngine) -> Self {
        Self {
            store_repo: StoreRepository::new(pool.clone()),
            user_repo: UserRepository::new(pool.clone()),
            scoped_members: ScopedRepo::new(pool.clone(), engine.clone()),
            audit_repo: AuditRepository::new(pool.clone()),
            engine,
            pool,
        }
    }

    // ---
    // Lojas
    // ---

    /// Cria uma loja e registra o criador como dono. Criar loja é uma
    /// operação de CONTA (não existe loja ainda para escopar): só
    /// contas de lojista (papel global OWNER) podem.
    pub async fn create_store(
        &self,
        ctx: &TenantContext,
        name: &str,
        currency: &str,
    ) -> Result<Store, AppError> {
        if ctx.role != GlobalRole::Owner {
            return Err(AppError::PermissionNotGranted("store.create"));
        }

        let mut tx = self.pool.begin().await?;
        let store = self
            .store_repo
            .create_store(&mut *tx, ctx.actor_id, name, currency)
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id: store.id,
                    resource_type: "store",
                    resource_id: store.id,
                    actor_id: ctx.actor_id,
                    action: "store.create",
                    from_state: None,
                    to_state: Some("ACTIVE"),
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(store = %store.id, owner = %ctx.actor_id, "loja criada");
        Ok(store)
    }

    pub async fn list_my_stores(&self, user_id: Uuid) -> Result<Vec<Store>, AppError> {
        self.store_repo.list_for_user(user_id).await
    }

    pub async fn get_store(&self, ctx: &TenantContext, store_id: Uuid) -> Result<Store, AppError> {
        self.engine
            .ensure(ctx, Permission::StoreRead, store_id)
            .await?;
        self.store_repo
            .find_by_id(store_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Atualiza status/moeda/limiar/bot. `store.update` não está na
    /// tabela fixa de ninguém: na prática, só o dono passa.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_store(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
        name: Option<&str>,
        status: Option<StoreStatus>,
        currency: Option<&str>,
        low_stock_threshold: Option<Decimal>,
        bot_token: Option<&str>,
    ) -> Result<Store, AppError> {
        self.engine
            .ensure(ctx, Permission::StoreUpdate, store_id)
            .await?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let store = self
            .store_repo
            .update_store(
                &mut *tx,
                store_id,
                name,
                status,
                currency,
                low_stock_threshold,
                bot_token,
            )
            .await?
            .ok_or(AppError::NotFound)?;

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "store",
                    resource_id: store_id,
                    actor_id: ctx.actor_id,
                    action: "store.update",
                    from_state: None,
                    to_state: status.map(|s| match s {
                        StoreStatus::Active => "ACTIVE",
                        StoreStatus::Inactive => "INACTIVE",
                        StoreStatus::Suspended => "SUSPENDED",
                    }),
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(store)
    }

    // ---
    // Equipe
    // ---

    pub async fn add_member(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
        user_id: Uuid,
        role: AssignmentRole,
    ) -> Result<StoreMember, AppError> {
        self.engine
            .ensure(ctx, Permission::UserCreate, store_id)
            .await?;

        let target = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| {
                AppError::ValidationFailed("Usuário não encontrado ou desativado.".to_string())
            })?;

        let store = self
            .store_repo
            .find_by_id(store_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if store.owner_id == target.id {
            return Err(AppError::ValidationFailed(
                "O dono da loja não entra na equipe: ele já pode tudo.".to_string(),
            ));
        }

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let member = self
            .store_repo
            .add_member(&mut *tx, store_id, target.id, role, ctx.actor_id)
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "store_member",
                    resource_id: member.id,
                    actor_id: ctx.actor_id,
                    action: "member.add",
                    from_state: None,
                    to_state: Some(match role {
                        AssignmentRole::Admin => "ADMIN",
                        AssignmentRole::Vendor => "VENDOR",
                    }),
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(member)
    }

    /// Remoção de equipe = desativação auditada do vínculo.
    pub async fn deactivate_member(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        self.engine
            .ensure(ctx, Permission::UserDelete, store_id)
            .await?;

        let member = self
            .store_repo
            .find_member(store_id, user_id)
            .await?
            .filter(|m| m.is_active)
            .ok_or(AppError::NotFound)?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let rows = self
            .store_repo
            .deactivate_member(&mut *tx, store_id, user_id)
            .await?;
        if rows == 0 {
            return Err(AppError::NotFound);
        }

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "store_member",
                    resource_id: member.id,
                    actor_id: ctx.actor_id,
                    action: "member.deactivate",
                    from_state: Some("ACTIVE"),
                    to_state: Some("INACTIVE"),
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_members(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
    ) -> Result<Vec<StoreMember>, AppError> {
        self.scoped_members.find_many(ctx, store_id).await
    }
}
