// src/services/authz.rs

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{RbacRepository, StoreRepository},
    middleware::tenancy::TenantContext,
    models::auth::GlobalRole,
    models::rbac::{Permission, RolePolicy},
    models::store::AssignmentRole,
};

// ---
// 1. Decisão de autorização
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenialReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    // Nenhum vínculo ativo com a loja do recurso
    NoStoreAccess,
    // Vínculo existe, mas não carrega a capacidade pedida
    PermissionNotGranted,
}

impl Decision {
    /// Converte a decisão num `Result`, com o erro certo da taxonomia.
    pub fn ensure(self, permission: Permission) -> Result<(), AppError> {
        match self {
            Decision::Allowed => Ok(()),
            Decision::Denied(DenialReason::NoStoreAccess) => Err(AppError::NoStoreAccess),
            Decision::Denied(DenialReason::PermissionNotGranted) => {
                Err(AppError::PermissionNotGranted(permission.slug()))
            }
        }
    }
}

// ---
// 2. Vistas carregadas do banco para a avaliação
// ---
// A loja do recurso (só o que a avaliação precisa: quem é o dono).
#[derive(Debug, Clone)]
pub struct StoreAccess {
    pub id: Uuid,
    pub owner_id: Uuid,
}

// O vínculo ATIVO do ator com a loja, com o cargo customizado já
// resolvido (se houver).
#[derive(Debug, Clone)]
pub struct MembershipView {
    pub role: AssignmentRole,
    pub custom_role: Option<CustomRoleGrant>,
}

#[derive(Debug, Clone)]
pub struct CustomRoleGrant {
    pub is_active: bool,
    pub permissions: HashSet<Permission>,
}

// ---
// 3. A avaliação em si (função PURA — sem IO, sem pânico)
// ---
// Algoritmo, na ordem:
//   1. OWNER da loja do recurso -> permite incondicionalmente.
//   2. CUSTOMER -> só a whitelist fixa, em qualquer loja.
//   3. Sem vínculo ativo -> NoStoreAccess.
//   4. Vínculo com cargo customizado -> decide SÓ pelo cargo (ativo e
//      contendo a permissão); cargo inativo nega na hora.
//   5. Senão, tabela fixa do papel do vínculo (ADMIN/VENDOR).
pub fn evaluate(
    policy: &RolePolicy,
    ctx: &TenantContext,
    permission: Permission,
    store: &StoreAccess,
    membership: Option<&MembershipView>,
) -> Decision {
    if ctx.role == GlobalRole::Owner && store.owner_id == ctx.actor_id {
        return Decision::Allowed;
    }

    if ctx.role == GlobalRole::Customer {
        return if policy.customer_whitelist.contains(&permission) {
            Decision::Allowed
        } else {
            Decision::Denied(DenialReason::PermissionNotGranted)
        };
    }

    let Some(membership) = membership else {
        return Decision::Denied(DenialReason::NoStoreAccess);
    };

    // Desempate: o cargo customizado SUBSTITUI a tabela fixa. Uma loja
    // pode estreitar o que seu ADMIN/VENDOR faz trocando a tabela fixa
    // por um cargo; o invariante de criação (subconjunto do criador)
    // garante que nunca alarga.
    if let Some(custom) = &membership.custom_role {
        return if custom.is_active && custom.permissions.contains(&permission) {
            Decision::Allowed
        } else {
            Decision::Denied(DenialReason::PermissionNotGranted)
        };
    }

    let table = match membership.role {
        AssignmentRole::Admin => &policy.admin,
        AssignmentRole::Vendor => &policy.vendor,
    };

    if table.contains(&permission) {
        Decision::Allowed
    } else {
        Decision::Denied(DenialReason::PermissionNotGranted)
    }
}

// ---
// 4. O motor (a casca com IO em volta da avaliação pura)
// ---
// A tabela fixa chega por injeção na construção — nada de singleton
// global; os testes passam uma RolePolicy alternativa.
//
// As leituras acontecem dentro da unidade de trabalho corrente, nunca de
// um cache: desativar um cargo customizado vale para o PRÓXIMO authorize
// depois do commit.
#[derive(Clone)]
pub struct PermissionEngine {
    policy: Arc<RolePolicy>,
    store_repo: StoreRepository,
    rbac_repo: RbacRepository,
}

impl PermissionEngine {
    pub fn new(pool: PgPool, policy: RolePolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            store_repo: StoreRepository::new(pool.clone()),
            rbac_repo: RbacRepository::new(pool),
        }
    }

    pub fn policy(&self) -> &RolePolicy {
        &self.policy
    }

    /// O contrato central: `authorize(ctx, permission, store_id)`.
    pub async fn authorize(
        &self,
        ctx: &TenantContext,
        permission: Permission,
        resource_store_id: Uuid,
    ) -> Result<Decision, AppError> {
        let Some(store) = self.store_repo.find_access(resource_store_id).await? else {
            // Loja inexistente: para o chamador é só "sem acesso".
            return Ok(Decision::Denied(DenialReason::NoStoreAccess));
        };

        let membership = self
            .rbac_repo
            .find_membership_view(resource_store_id, ctx.actor_id)
            .await?;

        let decision = evaluate(&self.policy, ctx, permission, &store, membership.as_ref());

        tracing::debug!(
            actor = %ctx.actor_id,
            store = %resource_store_id,
            permission = permission.slug(),
            allowed = matches!(decision, Decision::Allowed),
            "authorize"
        );

        Ok(decision)
    }

    /// `authorize` + conversão em erro. O caminho usado pelos serviços.
    pub async fn ensure(
        &self,
        ctx: &TenantContext,
        permission: Permission,
        resource_store_id: Uuid,
    ) -> Result<(), AppError> {
        self.authorize(ctx, permission, resource_store_id)
            .await?
            .ensure(permission)
    }

    /// O conjunto efetivo de permissões do ator NESTA loja — usado pelo
    /// invariante de subconjunto na criação de cargos.
    pub async fn effective_permissions(
        &self,
        ctx: &TenantContext,
        store_id: Uuid,
    ) -> Result<HashSet<Permission>, AppError> {
        let Some(store) = self.store_repo.find_access(store_id).await? else {
            return Ok(HashSet::new());
        };

        if ctx.role == GlobalRole::Owner && store.owner_id == ctx.actor_id {
            return Ok(Permission::all().iter().copied().collect());
        }

        if ctx.role == GlobalRole::Customer {
            return Ok(self.policy.customer_whitelist.clone());
        }

        let membership = self
            .rbac_repo
            .find_membership_view(store_id, ctx.actor_id)
            .await?;

        let Some(membership) = membership else {
            return Ok(HashSet::new());
        };

        if let Some(custom) = membership.custom_role {
            return Ok(if custom.is_active {
                custom.permissions
            } else {
                HashSet::new()
            });
        }

        Ok(match membership.role {
            AssignmentRole::Admin => self.policy.admin.clone(),
            AssignmentRole::Vendor => self.policy.vendor.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: GlobalRole) -> TenantContext {
        TenantContext {
            actor_id: Uuid::new_v4(),
            role,
            store_id: None,
            session_id: Uuid::new_v4(),
        }
    }

    fn store_of(owner_id: Uuid) -> StoreAccess {
        StoreAccess {
            id: Uuid::new_v4(),
            owner_id,
        }
    }

    #[test]
    fn owner_of_the_store_is_allowed_unconditionally() {
        let policy = RolePolicy::default();
        let ctx = ctx(GlobalRole::Owner);
        let store = store_of(ctx.actor_id);

        for perm in Permission::all() {
            assert_eq!(
                evaluate(&policy, &ctx, *perm, &store, None),
                Decision::Allowed,
                "dono negado em {}",
                perm.slug()
            );
        }
    }

    #[test]
    fn owner_of_another_store_without_membership_has_no_access() {
        let policy = RolePolicy::default();
        let ctx = ctx(GlobalRole::Owner);
        let store = store_of(Uuid::new_v4()); // dono é outra pessoa

        assert_eq!(
            evaluate(&policy, &ctx, Permission::OrderUpdate, &store, None),
            Decision::Denied(DenialReason::NoStoreAccess)
        );
    }

    #[test]
    fn customer_gets_only_the_whitelist_regardless_of_store() {
        let policy = RolePolicy::default();
        let ctx = ctx(GlobalRole::Customer);
        let store = store_of(Uuid::new_v4());

        assert_eq!(
            evaluate(&policy, &ctx, Permission::OrderCreate, &store, None),
            Decision::Allowed
        );
        assert_eq!(
            evaluate(&policy, &ctx, Permission::OrderReadOwn, &store, None),
            Decision::Allowed
        );
        assert_eq!(
            evaluate(&policy, &ctx, Permission::OrderUpdate, &store, None),
            Decision::Denied(DenialReason::PermissionNotGranted)
        );
        assert_eq!(
            evaluate(&policy, &ctx, Permission::UserDelete, &store, None),
            Decision::Denied(DenialReason::PermissionNotGranted)
        );
    }

    #[test]
    fn actor_without_membership_is_denied_with_no_store_access() {
        let policy = RolePolicy::default();
        let ctx = ctx(GlobalRole::Admin);
        let store = store_of(Uuid::new_v4());

        assert_eq!(
            evaluate(&policy, &ctx, Permission::ProductRead, &store, None),
            Decision::Denied(DenialReason::NoStoreAccess)
        );
    }

    #[test]
    fn fixed_tables_differ_between_admin_and_vendor() {
        let policy = RolePolicy::default();
        let store = store_of(Uuid::new_v4());

        let admin = MembershipView {
            role: AssignmentRole::Admin,
            custom_role: None,
        };
        let vendor = MembershipView {
            role: AssignmentRole::Vendor,
            custom_role: None,
        };

        let ctx_admin = ctx(GlobalRole::Admin);
        let ctx_vendor = ctx(GlobalRole::Vendor);

        assert_eq!(
            evaluate(&policy, &ctx_admin, Permission::UserDelete, &store, Some(&admin)),
            Decision::Allowed
        );
        assert_eq!(
            evaluate(&policy, &ctx_vendor, Permission::OrderUpdate, &store, Some(&vendor)),
            Decision::Denied(DenialReason::PermissionNotGranted)
        );
        assert_eq!(
            evaluate(&policy, &ctx_vendor, Permission::ProductUpdate, &store, Some(&vendor)),
            Decision::Allowed
        );
    }

    #[test]
    fn custom_role_replaces_the_fixed_table_entirely() {
        let policy = RolePolicy::default();
        let store = store_of(Uuid::new_v4());
        let ctx = ctx(GlobalRole::Admin);

        // ADMIN que recebeu um cargo enxuto: só leitura de produto.
        let membership = MembershipView {
            role: AssignmentRole::Admin,
            custom_role: Some(CustomRoleGrant {
                is_active: true,
                permissions: [Permission::ProductRead].into_iter().collect(),
            }),
        };

        assert_eq!(
            evaluate(&policy, &ctx, Permission::ProductRead, &store, Some(&membership)),
            Decision::Allowed
        );
        // A tabela fixa de ADMIN permitiria, mas o cargo manda:
        assert_eq!(
            evaluate(&policy, &ctx, Permission::UserCreate, &store, Some(&membership)),
            Decision::Denied(DenialReason::PermissionNotGranted)
        );
    }

    #[test]
    fn inactive_custom_role_denies_immediately() {
        let policy = RolePolicy::default();
        let store = store_of(Uuid::new_v4());
        let ctx = ctx(GlobalRole::Vendor);

        let membership = MembershipView {
            role: AssignmentRole::Vendor,
            custom_role: Some(CustomRoleGrant {
                is_active: false,
                permissions: [Permission::ProductRead].into_iter().collect(),
            }),
        };

        assert_eq!(
            evaluate(&policy, &ctx, Permission::ProductRead, &store, Some(&membership)),
            Decision::Denied(DenialReason::PermissionNotGranted)
        );
    }

    #[test]
    fn alternate_policy_table_is_honored() {
        // A tabela fixa é injetada: um teste pode trocá-la inteira.
        let policy = RolePolicy {
            admin: [Permission::AnalyticsView].into_iter().collect(),
            vendor: HashSet::new(),
            customer_whitelist: HashSet::new(),
        };
        let store = store_of(Uuid::new_v4());
        let ctx = ctx(GlobalRole::Admin);
        let membership = MembershipView {
            role: AssignmentRole::Admin,
            custom_role: None,
        };

        assert_eq!(
            evaluate(&policy, &ctx, Permission::AnalyticsView, &store, Some(&membership)),
            Decision::Allowed
        );
        assert_eq!(
            evaluate(&policy, &ctx, Permission::ProductRead, &store, Some(&membership)),
            Decision::Denied(DenialReason::PermissionNotGranted)
        );
    }
}
