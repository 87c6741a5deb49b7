// src/services/rbac_service.rs

use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::db_utils::begin_store_tx,
    common::error::AppError,
    db::audit_repo::NewAuditEntry,
    db::{AuditRepository, RbacRepository, ScopedRepo, StoreRepository},
    middleware::tenancy::TenantContext,
    models::rbac::{
        AssignRolePayload, CreateRolePayload, CustomRole, Permission, PermissionInfo,
        UpdateRolePayload,
    },
    services::authz::PermissionEngine,
};

// ---
// 1. O invariante de subconjunto (PURO)
// ---
// Ninguém cunha um cargo com capacidade que não tem: o conjunto pedido
// precisa ser não-vazio e estar contido no conjunto EFETIVO do criador
// no momento da chamada.
pub fn validate_role_grant(
    creator_effective: &HashSet<Permission>,
    requested: &[Permission],
) -> Result<(), AppError> {
    if requested.is_empty() {
        return Err(AppError::ValidationFailed(
            "O cargo precisa de ao menos uma permissão.".to_string(),
        ));
    }

    for permission in requested {
        if !creator_effective.contains(permission) {
            return Err(AppError::PermissionNotGranted(permission.slug()));
        }
    }

    Ok(())
}

/// O que aconteceu com o cargo num "delete": apagado de verdade ou só
/// desativado (porque alguém ainda o carrega).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleDeletionOutcome {
    Deleted,
    Deactivated,
}

// ---
// 2. O serviço
// ---
// Gestão de cargos é ela mesma gerida por permissão (user.create /
// user.update / user.delete) — não existe atalho.
#[derive(Clone)]
pub struct RbacService {
    pool: PgPool,
    engine: PermissionEngine,
    repo: RbacRepository,
    store_repo: StoreRepository,
    scoped_roles: ScopedRepo<CustomRole>,
    audit_repo: AuditRepository,
}

impl RbacService {
    pub fn new(pool: PgPool, engine: PermissionEngine) -> Self {
        Self {
            repo: RbacRepository::new(pool.clone()),
            store_repo: StoreRepository::new(pool.clone()),
            scoped_roles: ScopedRepo::new(pool.clone(), engine.clone()),
            audit_repo: AuditRepository::new(pool.clone()),
            engine,
            pool,
        }
    }

    pub async fn create_role(
        &self,
        ctx: &TenantContext,
        payload: CreateRolePayload,
    ) -> Result<CustomRole, AppError> {
        let store_id = ctx.require_store()?;
        self.engine
            .ensure(ctx, Permission::UserCreate, store_id)
            .await?;

        // Slug desconhecido derruba aqui, na fronteira.
        let permissions = Permission::parse_slugs(&payload.permissions)?;

        let effective = self.engine.effective_permissions(ctx, store_id).await?;
        validate_role_grant(&effective, &permissions)?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let role = self
            .repo
            .create_role(
                &mut *tx,
                store_id,
                &payload.name,
                payload.color.as_deref(),
                &permissions,
                ctx.actor_id,
            )
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "custom_role",
                    resource_id: role.id,
                    actor_id: ctx.actor_id,
                    action: "role.create",
                    from_state: None,
                    to_state: Some("ACTIVE"),
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(role)
    }

    pub async fn update_role(
        &self,
        ctx: &TenantContext,
        role_id: Uuid,
        payload: UpdateRolePayload,
    ) -> Result<CustomRole, AppError> {
        let store_id = ctx.require_store()?;
        self.engine
            .ensure(ctx, Permission::UserUpdate, store_id)
            .await?;

        // Confirma que o cargo é DESTA loja antes de qualquer coisa.
        self.repo
            .find_role(store_id, role_id)
            .await?
            .ok_or(AppError::NotFound)?;

        // Campos cosméticos (nome/cor) passam direto; só um novo
        // conjunto de permissões exige revalidar o subconjunto.
        let permissions = match &payload.permissions {
            Some(slugs) => {
                let parsed = Permission::parse_slugs(slugs)?;
                let effective = self.engine.effective_permissions(ctx, store_id).await?;
                validate_role_grant(&effective, &parsed)?;
                Some(parsed)
            }
            None => None,
        };

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let role = self
            .repo
            .update_role(
                &mut *tx,
                store_id,
                role_id,
                payload.name.as_deref(),
                payload.color.as_deref(),
                permissions.as_deref(),
            )
            .await?
            .ok_or(AppError::NotFound)?;

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "custom_role",
                    resource_id: role.id,
                    actor_id: ctx.actor_id,
                    action: "role.update",
                    from_state: None,
                    to_state: None,
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(role)
    }

    /// "Delete" de cargo: hard-delete só se ninguém ativo o carrega;
    /// senão desativa — e a desativação vale já no próximo `authorize`
    /// depois do commit, porque o motor lê o cargo do banco a cada
    /// decisão.
    pub async fn delete_role(
        &self,
        ctx: &TenantContext,
        role_id: Uuid,
    ) -> Result<RoleDeletionOutcome, AppError> {
        let store_id = ctx.require_store()?;
        self.engine
            .ensure(ctx, Permission::UserDelete, store_id)
            .await?;

        self.repo
            .find_role(store_id, role_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;

        // A contagem roda DENTRO da transação do flag: nenhuma janela
        // para um assign simultâneo transformar o delete num órfão.
        let holders = self.repo.count_active_holders(&mut *tx, role_id).await?;
        let outcome = if holders > 0 {
            self.repo.deactivate_role(&mut *tx, store_id, role_id).await?;
            RoleDeletionOutcome::Deactivated
        } else {
            self.repo.delete_role(&mut *tx, store_id, role_id).await?;
            RoleDeletionOutcome::Deleted
        };

        self.audit_repo
            .record(
                &mut *tx,
                NewAuditEntry {
                    store_id,
                    resource_type: "custom_role",
                    resource_id: role_id,
                    actor_id: ctx.actor_id,
                    action: match outcome {
                        RoleDeletionOutcome::Deleted => "role.delete",
                        RoleDeletionOutcome::Deactivated => "role.deactivate",
                    },
                    from_state: Some("ACTIVE"),
                    to_state: match outcome {
                        RoleDeletionOutcome::Deleted => None,
                        RoleDeletionOutcome::Deactivated => Some("INACTIVE"),
                    },
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(outcome)
    }

    pub async fn assign_role(
        &self,
        ctx: &TenantContext,
        payload: AssignRolePayload,
    ) -> Result<(), AppError> {
        let store_id = ctx.require_store()?;
        self.engine
            .ensure(ctx, Permission::UserUpdate, store_id)
            .await?;

        if let Some(role_id) = payload.custom_role_id {
            let role = self
                .repo
                .find_role(store_id, role_id)
                .await?
                .ok_or(AppError::NotFound)?;
            if !role.is_active {
                return Err(AppError::ValidationFailed(
                    "Este cargo está desativado e não pode ser atribuído.".to_string(),
                ));
            }
        }

        let member = self
            .store_repo
            .find_member(store_id, payload.user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !member.is_active {
            return Err(AppError::ValidationFailed(
                "Este membro está desativado.".to_string(),
            ));
        }

        let mut tx = begin_store_tx(&self.pool, store_id, ctx.actor_id).await?;
        let rows = self
            .repo
            .set_member_custom_role(&mut *tx, store_id, payload.user_id, payload.custom_role_id)
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
                    action: "role.assign",
                    from_state: member.custom_role_id.map(|_| "CUSTOM").or(Some("FIXED")),
                    to_state: payload.custom_role_id.map(|_| "CUSTOM").or(Some("FIXED")),
                    reason: None,
                },
            )
            .await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_roles(&self, ctx: &TenantContext) -> Result<Vec<CustomRole>, AppError> {
        let store_id = ctx.require_store()?;
        self.scoped_roles.find_many(ctx, store_id).await
    }

    /// O registro completo de permissões, para o frontend montar a tela
    /// de criação de cargos. A categoria é só agrupamento visual.
    pub fn list_permissions(&self) -> Vec<PermissionInfo> {
        Permission::all()
            .iter()
            .map(|p| PermissionInfo {
                slug: p.slug(),
                category: p.category(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_grant_must_not_be_empty() {
        let creator: HashSet<Permission> = Permission::all().iter().copied().collect();
        let err = validate_role_grant(&creator, &[]).unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
    }

    #[test]
    fn role_grant_must_be_subset_of_creator() {
        // Um ADMIN "enxugado" que só mexe em catálogo...
        let creator: HashSet<Permission> = [
            Permission::ProductCreate,
            Permission::ProductRead,
            Permission::ProductUpdate,
        ]
        .into_iter()
        .collect();

        // ...não pode cunhar um cargo que gerencia pessoas.
        let err = validate_role_grant(
            &creator,
            &[Permission::ProductRead, Permission::UserDelete],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::PermissionNotGranted("user.delete")
        ));
    }

    #[test]
    fn role_grant_within_creator_set_is_accepted() {
        let creator: HashSet<Permission> = [
            Permission::ProductRead,
            Permission::StockAdjust,
            Permission::OrderRead,
        ]
        .into_iter()
        .collect();

        assert!(validate_role_grant(
            &creator,
            &[Permission::ProductRead, Permission::OrderRead]
        )
        .is_ok());
    }
}
